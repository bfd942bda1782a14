//! Capture session
//!
//! A [Session] is built in two explicit stages: the global raw range is
//! computed over all the records first, then the records are put in
//! chronological order.

use std::ops::Deref;

use crate::{
    calibration::{compute_range, CalibrationError, GlobalRange},
    record::Record,
};

/// Sorts the records by timestamp
///
/// The sort is stable: records with the same timestamp keep their input order.
pub fn order(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by_key(|record| *record.timestamp());
    records
}

/// Chronologically ordered records with their global raw range
#[derive(Debug)]
pub struct Session {
    records: Vec<Record>,
    range: GlobalRange,
}
impl Session {
    pub fn new(records: Vec<Record>) -> Result<Self, CalibrationError> {
        let range = compute_range(&records)?;
        let records = order(records);
        if let (Some(first), Some(last)) = (records.first(), records.last()) {
            log::info!(
                "session: {} record(s) from {} to {}",
                records.len(),
                first.timestamp(),
                last.timestamp()
            );
        }
        Ok(Self { records, range })
    }
    pub fn range(&self) -> &GlobalRange {
        &self.range
    }
}
impl Deref for Session {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}
