/*!
# Rendering pipeline

The pipeline runs the following stages in sequence:
 1. load the records ([RecordStore]),
 2. calibrate the session raw range and sort the records ([Session]),
 3. create the frames directory ([StillWriter]) and open the video ([FfmpegVideo]),
 4. render, annotate and write every frame in chronological order,
 5. close the video.

Records that fail to load or to render are skipped with a warning,
failures of the outputs abort the run.
*/

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    calibration::CalibrationMapping,
    config::Config,
    error::error_chain,
    overlay::OverlayCompositor,
    record::{Record, RecordStore},
    render::{FrameRenderer, RenderError},
    session::Session,
    sink::{FfmpegVideo, FrameSink, StillWriter},
    Error,
};

type Result<T> = std::result::Result<T, Error>;

/// Frames written by a render pass
#[derive(Debug, Default)]
pub struct Summary {
    /// Number of frames written to the video
    pub n_frame: usize,
    /// Number of records that failed to render
    pub n_skipped: usize,
    /// Saved frame images, in video order
    pub stills: Vec<PathBuf>,
}

/// Result of a pipeline run
#[derive(Debug)]
pub enum Outcome {
    /// No valid record was found, no output was created
    NothingToRender,
    Rendered { video: PathBuf, summary: Summary },
}

pub struct Pipeline {
    config: Rc<Config>,
    renderer: FrameRenderer,
    overlay: Option<OverlayCompositor>,
}
impl Pipeline {
    /// Validates the configuration and sets up the renderer and the overlays
    pub fn new(config: Config) -> Result<Self> {
        let config = config.build()?;
        let overlay = if config.overlay {
            Some(OverlayCompositor::new(&config)?)
        } else {
            None
        };
        Ok(Self {
            renderer: FrameRenderer::new(&config),
            overlay,
            config,
        })
    }
    /// Renders the records of `store` into a video and a directory of frames
    pub fn run<P, Q>(&self, store: &RecordStore, video_path: P, frames_dir: Q) -> Result<Outcome>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let records = store.load()?;
        if records.is_empty() {
            log::warn!("no valid record in {:?}", store.path());
            return Ok(Outcome::NothingToRender);
        }
        let session = Session::new(records)?;

        let &Config {
            fps,
            output_size,
            ref ffmpeg,
            ref codec,
            ..
        } = &*self.config;
        let stills = StillWriter::create(&frames_dir)?;
        let mut video = FfmpegVideo::open(&video_path, fps, output_size, ffmpeg, codec)?;
        let summary = self.render_session(&session, &mut video, &stills);
        let closed = video.close();
        let summary = summary?;
        closed?;
        Ok(Outcome::Rendered {
            video: video_path.as_ref().to_path_buf(),
            summary,
        })
    }
    /// Renders a single record
    pub fn render_record(
        &self,
        record: &Record,
        mapping: &CalibrationMapping,
        session: &Session,
    ) -> std::result::Result<RgbImage, RenderError> {
        let mut image = self.renderer.render(record.frame(), session.range())?;
        if let Some(overlay) = &self.overlay {
            overlay.compose(&mut image, record, mapping);
        }
        Ok(image)
    }
    /// Renders the session records in order into `video` and `stills`
    pub fn render_session<S>(
        &self,
        session: &Session,
        video: &mut S,
        stills: &StillWriter,
    ) -> Result<Summary>
    where
        S: FrameSink + ?Sized,
    {
        let mapping = session.range().mapping(&self.config.calibration);
        log::info!(
            "scale bar: {:.2}°C to {:.2}°C",
            mapping.min_temperature(),
            mapping.max_temperature()
        );

        let pb = ProgressBar::new(session.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Rendering frames");

        let mut summary = Summary::default();
        for record in session.iter() {
            pb.inc(1);
            let image = match self.render_record(record, &mapping, session) {
                Ok(image) => image,
                Err(e) => {
                    pb.suspend(|| log::warn!("skipping {}: {}", record.id(), error_chain(&e)));
                    summary.n_skipped += 1;
                    continue;
                }
            };
            video.write(&image)?;
            summary.stills.push(stills.save(record.id(), &image)?);
            summary.n_frame += 1;
        }
        pb.finish_with_message("All frames rendered");
        log::info!(
            "{} frame(s) saved to {:?}, {} skipped",
            summary.n_frame,
            stills.dir(),
            summary.n_skipped
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::{
        record::tests::write_record,
        render::quantize,
        sink::SinkError,
        GlobalRange,
    };
    #[cfg(unix)]
    use crate::sink::tests::stub_encoder;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<RgbImage>,
        n_close: usize,
    }
    impl FrameSink for Recorder {
        fn write(&mut self, frame: &RgbImage) -> std::result::Result<(), SinkError> {
            self.frames.push(frame.clone());
            Ok(())
        }
        fn close(&mut self) -> std::result::Result<(), SinkError> {
            self.n_close += 1;
            Ok(())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Config::default().overlay(false)).unwrap()
    }

    fn three_records(dir: &Path) {
        write_record(
            dir,
            "a.pkl",
            vec![vec![50., 150.], vec![100., 75.]],
            "2025-04-02 13:04:44.200000",
        );
        write_record(
            dir,
            "b.pkl",
            vec![vec![0., 100.], vec![20., 40.]],
            "2025-04-02 13:04:44.100000",
        );
        write_record(
            dir,
            "c.pkl",
            vec![vec![25., 75.], vec![30., 60.]],
            "2025-04-02 13:04:44.300000",
        );
    }

    #[test]
    fn session_scenario() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        three_records(dir.path());
        let session = Session::new(RecordStore::new(dir.path()).load()?)?;
        assert_eq!(*session.range(), GlobalRange::new(0., 150.));
        let order: Vec<_> = session.iter().map(|r| r.id()).collect();
        assert_eq!(order, vec!["b.pkl", "a.pkl", "c.pkl"]);
        assert_eq!(quantize(session[1].frame(), session.range())[0], 85);

        let pipeline = pipeline();
        let stills = StillWriter::create(dir.path().join("FLIR_Frames"))?;
        let mut video = Recorder::default();
        let summary = pipeline.render_session(&session, &mut video, &stills)?;
        assert_eq!(summary.n_frame, 3);
        assert_eq!(summary.n_skipped, 0);
        assert_eq!(video.frames.len(), 3);
        let mapping = session.range().mapping(&Default::default());
        for (frame, record) in video.frames.iter().zip(session.iter()) {
            assert_eq!(frame.dimensions(), (640, 480));
            assert_eq!(frame, &pipeline.render_record(record, &mapping, &session)?);
        }
        let names: Vec<_> = summary
            .stills
            .iter()
            .filter_map(|p| p.file_name())
            .filter_map(|p| p.to_str())
            .collect();
        assert_eq!(names, vec!["b.pkl.png", "a.pkl.png", "c.pkl.png"]);
        assert!(summary.stills.iter().all(|p| p.is_file()));
        Ok(())
    }

    #[test]
    fn invalid_timestamp() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        three_records(dir.path());
        write_record(
            dir.path(),
            "d.pkl",
            vec![vec![1000.]],
            "2025-04-02T13:04:44",
        );
        let session = Session::new(RecordStore::new(dir.path()).load()?)?;
        assert_eq!(session.len(), 3);
        // the invalid record does not widen the range
        assert_eq!(*session.range(), GlobalRange::new(0., 150.));
        let stills = StillWriter::create(dir.path().join("frames"))?;
        let mut video = Recorder::default();
        let summary = pipeline().render_session(&session, &mut video, &stills)?;
        assert_eq!(summary.n_frame, 3);
        assert_eq!(video.frames.len(), 3);
        assert_eq!(video.n_close, 0);
        Ok(())
    }

    #[test]
    fn two_valid_records() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_record(dir.path(), "1.pkl", vec![vec![1., 2.]], "2025-04-02 13:04:44.1");
        write_record(dir.path(), "2.pkl", vec![vec![3., 4.]], "yesterday");
        write_record(dir.path(), "3.pkl", vec![vec![5., 6.]], "2025-04-02 13:04:44.3");
        let session = Session::new(RecordStore::new(dir.path()).load()?)?;
        let stills = StillWriter::create(dir.path().join("frames"))?;
        let mut video = Recorder::default();
        let summary = pipeline().render_session(&session, &mut video, &stills)?;
        assert_eq!(summary.n_frame, 2);
        assert_eq!(video.frames.len(), 2);
        Ok(())
    }

    #[test]
    fn degenerate_session() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_record(dir.path(), "1.pkl", vec![vec![7.; 3]; 2], "2025-04-02 13:04:44.1");
        write_record(dir.path(), "2.pkl", vec![vec![7.; 5]; 4], "2025-04-02 13:04:44.2");
        let session = Session::new(RecordStore::new(dir.path()).load()?)?;
        let stills = StillWriter::create(dir.path().join("frames"))?;
        let mut video = Recorder::default();
        pipeline().render_session(&session, &mut video, &stills)?;
        let zero = crate::Palette::Jet.lut(true).get(0);
        assert!(video
            .frames
            .iter()
            .all(|frame| frame.pixels().all(|p| *p == zero)));
        Ok(())
    }

    #[test]
    fn nothing_to_render() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        write_record(dir.path(), "bad.pkl", vec![vec![1.]], "");
        let video = dir.path().join("FLIR.mp4");
        let frames = dir.path().join("FLIR_Frames");
        let outcome = pipeline().run(&RecordStore::new(dir.path()), &video, &frames)?;
        assert!(matches!(outcome, Outcome::NothingToRender));
        assert!(!video.exists());
        assert!(!frames.exists());
        Ok(())
    }

    #[test]
    fn missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = pipeline().run(
            &RecordStore::new(dir.path().join("FLIR")),
            dir.path().join("FLIR.mp4"),
            dir.path().join("FLIR_Frames"),
        );
        assert!(matches!(result, Err(Error::Record(_))));
    }

    #[test]
    fn missing_encoder() {
        let dir = tempfile::tempdir().unwrap();
        three_records(dir.path());
        let pipeline =
            Pipeline::new(Config::default().overlay(false).ffmpeg("/nonexistent/ffmpeg")).unwrap();
        let frames = dir.path().join("FLIR_Frames");
        let result = pipeline.run(
            &RecordStore::new(dir.path()),
            dir.path().join("FLIR.mp4"),
            &frames,
        );
        assert!(matches!(result, Err(Error::Sink(SinkError::Spawn(..)))));
        assert!(!frames.exists());
    }

    #[test]
    fn annotated() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config = Config::default();
        if !config.font.exists() {
            return Ok(());
        }
        let dir = tempfile::tempdir()?;
        three_records(dir.path());
        let session = Session::new(RecordStore::new(dir.path()).load()?)?;
        let mapping = session.range().mapping(&Default::default());
        let annotated = Pipeline::new(config)?;
        let plain = pipeline();
        let record = &session[0];
        assert_ne!(
            annotated.render_record(record, &mapping, &session)?,
            plain.render_record(record, &mapping, &session)?
        );
        Ok(())
    }

    #[test]
    fn frames_dir_failure() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        three_records(dir.path());
        let video = dir.path().join("FLIR.mp4");
        let frames = dir.path().join("FLIR_Frames");
        fs::write(&frames, b"not a directory")?;
        let result = pipeline().run(&RecordStore::new(dir.path()), &video, &frames);
        assert!(matches!(result, Err(Error::Sink(SinkError::CreateDir(..)))));
        assert!(!video.exists());
        Ok(())
    }

    #[cfg(unix)]
    fn encoded_pipeline(ffmpeg: &Path) -> Pipeline {
        Pipeline::new(Config::default().overlay(false).ffmpeg(ffmpeg.display())).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let records = dir.path().join("FLIR");
        fs::create_dir(&records)?;
        three_records(&records);
        let pipeline = encoded_pipeline(&stub_encoder(dir.path(), 0));
        let video = dir.path().join("FLIR.mp4");
        let frames = dir.path().join("FLIR_Frames");
        let Outcome::Rendered {
            video: path,
            summary,
        } = pipeline.run(&RecordStore::new(&records), &video, &frames)?
        else {
            panic!("expected a rendered session");
        };
        assert_eq!(path, video);
        assert_eq!(summary.n_frame, 3);
        // the encoder received every frame before being closed
        assert_eq!(fs::metadata(&video)?.len(), 3 * 640 * 480 * 3);
        assert_eq!(fs::read_dir(&frames)?.count(), 3);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn still_failure_closes_video() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let records = dir.path().join("FLIR");
        fs::create_dir(&records)?;
        three_records(&records);
        let video = dir.path().join("FLIR.mp4");
        let frames = dir.path().join("FLIR_Frames");
        // the second frame in time order cannot be saved
        fs::create_dir_all(frames.join("a.pkl.png"))?;
        let pipeline = encoded_pipeline(&stub_encoder(dir.path(), 0));
        let result = pipeline.run(&RecordStore::new(&records), &video, &frames);
        assert!(matches!(result, Err(Error::Sink(SinkError::Save(..)))));
        assert_eq!(fs::metadata(&video)?.len(), 2 * 640 * 480 * 3);
        assert!(frames.join("b.pkl.png").is_file());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn first_frame_failure_closes_video() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let records = dir.path().join("FLIR");
        fs::create_dir(&records)?;
        three_records(&records);
        let video = dir.path().join("FLIR.mp4");
        let frames = dir.path().join("FLIR_Frames");
        fs::create_dir_all(frames.join("b.pkl.png"))?;
        let pipeline = encoded_pipeline(&stub_encoder(dir.path(), 0));
        let result = pipeline.run(&RecordStore::new(&records), &video, &frames);
        assert!(matches!(result, Err(Error::Sink(SinkError::Save(..)))));
        // the video was finalized with the single streamed frame
        assert_eq!(fs::metadata(&video)?.len(), 640 * 480 * 3);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn encoder_failure() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let records = dir.path().join("FLIR");
        fs::create_dir(&records)?;
        three_records(&records);
        let pipeline = encoded_pipeline(&stub_encoder(dir.path(), 1));
        let result = pipeline.run(
            &RecordStore::new(&records),
            dir.path().join("FLIR.mp4"),
            dir.path().join("FLIR_Frames"),
        );
        assert!(matches!(result, Err(Error::Sink(SinkError::Encoder { .. }))));
        Ok(())
    }
}
