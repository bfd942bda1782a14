//! Thermal camera records
//!
//! Each record is a pickle file written by the acquisition software holding
//! a dictionary with (at least) the keys:
//!  - `frame`: the raw sensor frame as a list of rows,
//!  - `timestamp`: the capture time as `YYYY-MM-DD HH:MM:SS.ffffff`.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use glob::{glob, Pattern};
use serde::Deserialize;
use serde_pickle as pickle;

use crate::error::error_chain;

/// Timestamp format of the records
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("failed to open {1:?}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("failed to decode {1:?}")]
    Pickle(#[source] pickle::Error, PathBuf),
    #[error("record directory {0:?} not found")]
    MissingDirectory(PathBuf),
    #[error("invalid record file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("empty frame")]
    EmptyFrame,
    #[error("frame row #{row} has {found} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("frame has {0} values, expected {1}x{2}")]
    Shape(usize, usize, usize),
    #[error("frame contains non finite values")]
    NonFinite,
    #[error("invalid timestamp {1:?}")]
    Timestamp(#[source] chrono::ParseError, String),
}
type Result<T> = std::result::Result<T, RecordError>;

/// Raw sensor frame (row-major)
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<f64>,
}
impl Frame {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != width * height {
            return Err(RecordError::Shape(data.len(), width, height));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(RecordError::NonFinite);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
    /// Builds a frame from a list of rows of equal length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        if width == 0 {
            return Err(RecordError::EmptyFrame);
        }
        let mut data = Vec::with_capacity(width * height);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(RecordError::Ragged {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            data.extend(values);
        }
        Self::new(width, height, data)
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Iterator over the frame values
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }
    /// Returns the range of the frame values
    pub fn range(&self) -> (f64, f64) {
        (
            self.values().fold(f64::INFINITY, f64::min),
            self.values().fold(f64::NEG_INFINITY, f64::max),
        )
    }
}

/// On-disk layout of a record
#[derive(Deserialize, Debug)]
struct RawRecord {
    frame: Vec<Vec<f64>>,
    timestamp: String,
}

/// One capture: a raw frame and its timestamp
#[derive(Debug, Clone)]
pub struct Record {
    id: String,
    frame: Frame,
    timestamp: NaiveDateTime,
}
impl Record {
    pub fn new(id: impl ToString, frame: Frame, timestamp: &str) -> Result<Self> {
        let timestamp = parse_timestamp(timestamp)?;
        if frame.is_empty() {
            return Err(RecordError::EmptyFrame);
        }
        Ok(Self {
            id: id.to_string(),
            frame,
            timestamp,
        })
    }
    /// Loads a record from a pickle file
    ///
    /// The record identifier is the file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecordError::Open(e, path.to_path_buf()))?;
        let raw: RawRecord = pickle::from_reader(BufReader::new(file), Default::default())
            .map_err(|e| RecordError::Pickle(e, path.to_path_buf()))?;
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(id, Frame::from_rows(raw.frame)?, &raw.timestamp)
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
    pub fn timestamp(&self) -> &NaiveDateTime {
        &self.timestamp
    }
}

pub fn parse_timestamp(timestamp: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| RecordError::Timestamp(e, timestamp.to_string()))
}

/// Record files loader
pub struct RecordStore {
    path: PathBuf,
    pattern: String,
}
impl RecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pattern: String::from("*.pkl"),
        }
    }
    /// Sets the record file name pattern (default: `*.pkl`)
    pub fn pattern(self, pattern: impl ToString) -> Self {
        Self {
            pattern: pattern.to_string(),
            ..self
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// Loads all the valid records of the directory
    ///
    /// Records that cannot be read are skipped with a warning.
    /// The records are returned in file name order.
    pub fn load(&self) -> Result<Vec<Record>> {
        if !self.path.is_dir() {
            return Err(RecordError::MissingDirectory(self.path.clone()));
        }
        let pattern = format!(
            "{}/{}",
            Pattern::escape(&self.path.to_string_lossy()),
            self.pattern
        );
        let mut records = vec![];
        for entry in glob(&pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("skipping {:?}: {}", e.path(), e.error());
                    continue;
                }
            };
            match Record::from_path(&path) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("skipping {:?}: {}", path, error_chain(&e)),
            }
        }
        log::info!("loaded {} record(s) from {:?}", records.len(), self.path);
        Ok(records)
    }
}
