//! Feed timestamp parsing.
//!
//! The feed spells timestamps the way `date(1)` does:
//! `Tue Sep 13 14:05:01 PDT 2022`. The weekday and zone tokens are matched but
//! not interpreted; times are taken as facility wall-clock time.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::domain::{OccupancyRecord, Sample};
use crate::error::AppError;

const TIMESTAMP_PATTERN: &str = r"^\s*(?P<day_of_week>\w+)\s+(?P<month>\w+)\s+(?P<day>\d+)\s+(?P<hour>\d+):(?P<minute>\d+):(?P<second>\d+)\s+(?P<timezone>\w+)\s+(?P<year>\d+)\s*$";

const NORMALIZED_FORMAT: &str = "%Y-%b-%d %H:%M:%S";

/// Memo is cleared once it holds this many timestamps.
const MEMO_CAPACITY: usize = 4096;

pub struct TimestampParser {
    re: Regex,
    memo: HashMap<String, NaiveDateTime>,
}

impl TimestampParser {
    pub fn new() -> Result<Self, AppError> {
        let re = Regex::new(TIMESTAMP_PATTERN)
            .map_err(|e| AppError::data(format!("Invalid timestamp pattern: {e}")))?;
        Ok(Self {
            re,
            memo: HashMap::new(),
        })
    }

    /// Parse one feed timestamp.
    pub fn parse(&mut self, raw: &str) -> Result<NaiveDateTime, AppError> {
        let caps = self
            .re
            .captures(raw)
            .ok_or_else(|| AppError::data(format!("Unrecognized timestamp '{raw}'.")))?;

        let key = format!(
            "{}-{}-{} {}:{}:{}",
            &caps["year"],
            &caps["month"],
            &caps["day"],
            &caps["hour"],
            &caps["minute"],
            &caps["second"],
        );

        if let Some(dt) = self.memo.get(&key) {
            return Ok(*dt);
        }

        let dt = NaiveDateTime::parse_from_str(&key, NORMALIZED_FORMAT)
            .map_err(|e| AppError::data(format!("Invalid timestamp '{raw}': {e}")))?;

        if self.memo.len() >= MEMO_CAPACITY {
            self.memo.clear();
        }
        self.memo.insert(key, dt);
        Ok(dt)
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

/// Parse every record's timestamp, preserving feed order.
pub fn parse_records(records: &[OccupancyRecord]) -> Result<Vec<Sample>, AppError> {
    let mut parser = TimestampParser::new()?;
    records
        .iter()
        .map(|r| {
            Ok(Sample {
                at: parser.parse(&r.datetime)?,
                count: r.count,
            })
        })
        .collect()
}
