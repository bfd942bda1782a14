use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use flir_video::{
    config::{DEFAULT_FONT, DEFAULT_SESSION_ID},
    Calibration, Config, Outcome, Palette, Pipeline, RecordStore, Subsecond,
};

#[derive(Parser)]
#[command(name = "flir-video")]
#[command(about = "Renders FLIR camera records into a calibrated false-color video and annotated frames")]
struct Args {
    /// Capture session directory (with a `FLIR` subdirectory) or records directory
    path: PathBuf,
    /// Name of the records subdirectory of a capture session
    #[arg(long, default_value = "FLIR")]
    flir_dir: String,
    /// Record file name pattern
    #[arg(long, default_value = "*.pkl")]
    pattern: String,
    /// Output video [default: <session>/FLIR.mp4]
    #[arg(long)]
    video: Option<PathBuf>,
    /// Output frames directory [default: <session>/FLIR_Frames]
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Video frame rate
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Output frame width
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Output frame height
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Temperature of the session minimum raw value [C]
    #[arg(long, default_value_t = 25.)]
    t_min: f64,
    /// Temperature of the session maximum raw value [C]
    #[arg(long, default_value_t = 173.)]
    t_max: f64,
    /// Label the scale bar with the raw sensor values instead of temperatures
    #[arg(long)]
    raw_labels: bool,
    /// False-color palette
    #[arg(long, value_enum, default_value_t = Palette::Jet)]
    palette: Palette,
    /// Do not reverse the palette when coloring the frames
    #[arg(long)]
    no_invert: bool,
    /// Identifier printed in front of the timestamps
    #[arg(long, default_value = DEFAULT_SESSION_ID)]
    session_id: String,
    /// Print the timestamps with microseconds
    #[arg(long)]
    microseconds: bool,
    /// Do not draw the scale bar and the timestamps
    #[arg(long)]
    no_overlay: bool,
    /// TrueType font of the overlays
    #[arg(long, default_value = DEFAULT_FONT)]
    font: PathBuf,
    /// ffmpeg video codec
    #[arg(long, default_value = "mpeg4")]
    codec: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // capture session layout: <session>/FLIR/*.pkl
    let (records_dir, video, frames) = {
        let flir = args.path.join(&args.flir_dir);
        if flir.is_dir() {
            (
                flir,
                args.path.join(format!("{}.mp4", args.flir_dir)),
                args.path.join(format!("{}_Frames", args.flir_dir)),
            )
        } else {
            let name = args
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| args.flir_dir.clone());
            (
                args.path.clone(),
                args.path.with_file_name(format!("{}.mp4", name)),
                args.path.with_file_name(format!("{}_Frames", name)),
            )
        }
    };
    let video = args.video.unwrap_or(video);
    let frames = args.frames.unwrap_or(frames);

    let calibration = if args.raw_labels {
        Calibration::Raw
    } else {
        Calibration::Temperature {
            min: args.t_min,
            max: args.t_max,
        }
    };
    let config = Config::default()
        .fps(args.fps)
        .output_size(args.width, args.height)
        .calibration(calibration)
        .palette(args.palette)
        .inverted(!args.no_invert)
        .session_id(args.session_id)
        .subsecond(if args.microseconds {
            Subsecond::Micros
        } else {
            Subsecond::Millis
        })
        .overlay(!args.no_overlay)
        .font(args.font)
        .codec(args.codec);

    let pipeline = Pipeline::new(config).context("failed to set up the rendering pipeline")?;
    let store = RecordStore::new(&records_dir).pattern(args.pattern);
    match pipeline
        .run(&store, &video, &frames)
        .with_context(|| format!("failed to render {:?}", records_dir))?
    {
        Outcome::NothingToRender => {
            log::warn!("no valid input in {:?}, nothing to render", records_dir);
        }
        Outcome::Rendered { video, summary } => {
            println!(
                "Video saved: {:?} ({} frames, {} skipped)",
                video, summary.n_frame, summary.n_skipped
            );
            println!("Frames saved in {:?}", frames);
        }
    }

    Ok(())
}
