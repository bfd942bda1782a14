//! Output sinks
//!
//! The rendered frames are streamed to an `ffmpeg` process ([FfmpegVideo])
//! and saved individually as PNG images ([StillWriter]).

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use image::{ImageError, RgbImage};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create directory {1:?}")]
    CreateDir(#[source] io::Error, PathBuf),
    #[error("failed to start the video encoder {1:?}")]
    Spawn(#[source] io::Error, String),
    #[error("failed to stream a frame to the video encoder")]
    Write(#[source] io::Error),
    #[error("failed to wait for the video encoder")]
    Wait(#[source] io::Error),
    #[error("frame size {0:?} does not match the video size {1:?}")]
    FrameSize((u32, u32), (u32, u32)),
    #[error("video encoder failed ({status}): {stderr}")]
    Encoder { status: String, stderr: String },
    #[error("video {0:?} is already closed")]
    Closed(PathBuf),
    #[error("failed to save frame to {1:?}")]
    Save(#[source] ImageError, PathBuf),
}
type Result<T> = std::result::Result<T, SinkError>;

/// Ordered sequence of fixed size frames
pub trait FrameSink {
    /// Appends a frame
    fn write(&mut self, frame: &RgbImage) -> Result<()>;
    /// Flushes and finalizes the sink, subsequent calls are no-ops
    fn close(&mut self) -> Result<()>;
}

fn create_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|e| SinkError::CreateDir(e, path.to_path_buf()))
}

/// Video encoded by an `ffmpeg` child process fed with raw RGB frames
pub struct FfmpegVideo {
    path: PathBuf,
    size: (u32, u32),
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    n_frame: usize,
}
impl FfmpegVideo {
    /// Starts the video encoder
    ///
    /// The parent directory of `path` is created if needed.
    pub fn open<P: AsRef<Path>>(
        path: P,
        fps: u32,
        size: (u32, u32),
        ffmpeg: &str,
        codec: &str,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir(parent)?;
            }
        }
        let (width, height) = size;
        let mut cmd = Command::new(ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-c:v")
            .arg(codec)
            .arg("-q:v")
            .arg("2")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg(path.as_os_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .map_err(|e| SinkError::Spawn(e, ffmpeg.to_string()))?;
        let stdin = child.stdin.take().map(BufWriter::new);
        log::info!(
            "encoding {:?} ({}x{} @ {}fps, {})",
            path,
            width,
            height,
            fps,
            codec
        );
        Ok(Self {
            path,
            size,
            child: Some(child),
            stdin,
            n_frame: 0,
        })
    }
}
impl FrameSink for FfmpegVideo {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != self.size {
            return Err(SinkError::FrameSize(frame.dimensions(), self.size));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SinkError::Closed(self.path.clone()))?;
        stdin.write_all(frame.as_raw()).map_err(SinkError::Write)?;
        self.n_frame += 1;
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        let Some(child) = self.child.take() else {
            return Ok(());
        };
        // closing stdin signals the end of the stream to ffmpeg
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(SinkError::Wait)?;
        if !output.status.success() {
            return Err(SinkError::Encoder {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        flushed.map_err(SinkError::Write)?;
        if self.n_frame == 0 {
            log::warn!("{:?}: no frame written", self.path);
        } else {
            log::info!("{:?}: {} frame(s) encoded", self.path, self.n_frame);
        }
        Ok(())
    }
}
impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("{}", crate::error::error_chain(&e));
        }
    }
}

/// Individual frame images writer
#[derive(Debug, Clone)]
pub struct StillWriter {
    dir: PathBuf,
}
impl StillWriter {
    /// Creates the frames directory if it does not exist
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        create_dir(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    /// Image file name of a record
    pub fn still_name(record_id: &str) -> String {
        format!("{}.png", record_id)
    }
    /// Saves the frame as `<record id>.png`
    pub fn save(&self, record_id: &str, frame: &RgbImage) -> Result<PathBuf> {
        let path = self.dir.join(Self::still_name(record_id));
        frame
            .save(&path)
            .map_err(|e| SinkError::Save(e, path.clone()))?;
        Ok(path)
    }
}
