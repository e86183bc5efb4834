//! Port interval helpers.
//!
//! `PortRange` is an administratively declared `start-end` interval;
//! `PortRun` is one maximal block of consecutive allocated ports.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Malformed `start-end` policy interval
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid port range '{input}': {reason}")]
pub struct RangeError {
    pub input: String,
    pub reason: String,
}

/// Inclusive numeric interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u32,
    pub end: u32,
}

impl PortRange {
    /// Parse `"start-end"`. Whitespace around either bound is ignored.
    pub fn parse(range_str: &str) -> Result<Self, RangeError> {
        let err = |reason: &str| RangeError {
            input: range_str.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = range_str
            .split_once('-')
            .ok_or_else(|| err("expected START-END"))?;
        let start: u32 = start.trim().parse().map_err(|_| err("start is not a number"))?;
        let end: u32 = end.trim().parse().map_err(|_| err("end is not a number"))?;

        if start > end {
            return Err(err("start is greater than end"));
        }

        Ok(PortRange { start, end })
    }

    pub fn contains(&self, port: u32) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A maximal run of consecutive ports. `start == end` for a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRun {
    pub start: u16,
    pub end: u16,
}

impl PortRun {
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }
}

impl fmt::Display for PortRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Compress a port set into the minimal ascending list of consecutive runs.
///
/// No two emitted runs touch or overlap, and their union equals the input.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use deploycheck::utils::ranges::{format_runs, merge_consecutive};
///
/// let ports: BTreeSet<u16> = [8001, 8002, 8003, 8010].into_iter().collect();
/// assert_eq!(format_runs(&merge_consecutive(&ports)), "8001-8003, 8010");
/// ```
pub fn merge_consecutive(ports: &BTreeSet<u16>) -> Vec<PortRun> {
    let mut runs = Vec::new();
    let mut iter = ports.iter().copied();

    let Some(first) = iter.next() else {
        return runs;
    };

    let mut current = PortRun { start: first, end: first };
    for port in iter {
        // BTreeSet iteration is strictly ascending, so `end + 1` cannot overflow here
        if u32::from(port) == u32::from(current.end) + 1 {
            current.end = port;
        } else {
            runs.push(current);
            current = PortRun { start: port, end: port };
        }
    }
    runs.push(current);

    runs
}

/// Render runs as `"8001-8003, 8010"`
pub fn format_runs(runs: &[PortRun]) -> String {
    runs.iter()
        .map(|run| run.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
