use std::io::{BufRead, BufReader, Read};
use std::time::{Duration, Instant};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::address::Address;
use crate::backing::{HostMemory, HostMemoryError};
use crate::cache::{Cache, ReadStatus};
use crate::config::CacheConfig;
use crate::error::{ConfigurationError, ReplayError};
use crate::stats::Statistics;

lazy_static! {
    static ref TRACE_LINE: Regex = Regex::new(r"^\s*(?P<op>[WCFR])\s+(?:0[xX])?(?P<address>[0-9a-fA-F]+)\s+(?P<size>[0-9]+)\s*$")
        .expect("trace line pattern is valid");
}

/// One operation of a trace
///
/// Traces hold one operation per line, `<op> <hex address> <size>`. Blank lines and `#` comments
/// are skipped
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraceOp {
    /// `W`: resolve, seeding the resource from host content
    Write { address: Address, size: usize },
    /// `C`: resolve without host content
    Create { address: Address, size: usize },
    /// `F`: resolve without host content, recreating the resource even if resident
    Force { address: Address, size: usize },
    /// `R`: blocking read back to the host
    Read { address: Address, size: usize },
}

/// Parses one operation line of a trace, `None` if it isn't one
///
/// # Examples
///
/// ```
/// use devcache::address::Address;
/// use devcache::simulator::{parse_trace_line, TraceOp};
/// let op = parse_trace_line("W 0x40 64");
/// assert_eq!(op, Some(TraceOp::Write { address: Address::new(64), size: 64 }));
/// assert_eq!(parse_trace_line("X 40 64"), None);
/// ```
pub fn parse_trace_line(text: &str) -> Option<TraceOp> {
    let tokens = TRACE_LINE.captures(text)?;
    let address = Address::new(u64::from_str_radix(tokens.name("address")?.as_str(), 16).ok()?);
    let size = tokens.name("size")?.as_str().parse::<usize>().ok()?;
    let op = match tokens.name("op")?.as_str() {
        "W" => TraceOp::Write { address, size },
        "C" => TraceOp::Create { address, size },
        "F" => TraceOp::Force { address, size },
        _ => TraceOp::Read { address, size },
    };
    Some(op)
}

/// The result of replaying a trace. Can be serialised to compare against expected output
#[derive(Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ReplayReport {
    /// Resolves answered from a resident line without touching the backing store
    pub resolves_reused: u64,
    /// Resolves which created a backing resource
    pub resolves_created: u64,
    pub read_hits: u64,
    pub read_misses: u64,
    pub statistics: Statistics,
}

/// Replays a trace of resolve and read back operations against a cache backed by host memory
///
/// Supports calling replay multiple times, the cache, the report, and the time taken all carry on
/// from the previous call
pub struct Replayer {
    cache: Cache<HostMemory>,
    report: ReplayReport,
    replay_time: Duration,
}

impl Replayer {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigurationError> {
        Ok(Self {
            cache: Cache::new(config, HostMemory::default())?,
            report: ReplayReport::default(),
            replay_time: Duration::new(0, 0),
        })
    }

    /// Runs every operation of a trace through the cache
    ///
    /// Stops at the first line which can't be parsed, or the first backing store failure
    ///
    /// # Arguments
    ///
    /// * `trace`: The trace, one operation per line
    ///
    /// returns: Result<&ReplayReport, ReplayError>
    pub fn replay<T: Read>(&mut self, trace: T) -> Result<&ReplayReport, ReplayError> {
        let start = Instant::now();
        for (index, text) in BufReader::new(trace).lines().enumerate() {
            let text = text?;
            let line = index + 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let op = parse_trace_line(trimmed).ok_or_else(|| ReplayError::Parse { line, text: text.clone() })?;
            self.apply(op).map_err(|e| ReplayError::Backing { line, message: e.to_string() })?;
        }
        self.replay_time += start.elapsed();
        self.report.statistics = self.cache.statistics();
        debug!(report = ?self.report, "trace replayed");
        Ok(&self.report)
    }

    fn apply(&mut self, op: TraceOp) -> Result<(), HostMemoryError> {
        match op {
            TraceOp::Write { address, size } => {
                let content = content_for(address, size);
                self.resolve(address, size, Some(&content), false)
            }
            TraceOp::Create { address, size } => self.resolve(address, size, None, false),
            TraceOp::Force { address, size } => self.resolve(address, size, None, true),
            TraceOp::Read { address, size } => {
                let mut destination = vec![0u8; size];
                match self.cache.read_back(address, size, &mut destination, true)? {
                    ReadStatus::Success => self.report.read_hits += 1,
                    ReadStatus::Miss => self.report.read_misses += 1,
                }
                Ok(())
            }
        }
    }

    fn resolve(&mut self, address: Address, size: usize, content: Option<&[u8]>, force: bool) -> Result<(), HostMemoryError> {
        let before = self.cache.statistics().mem_copies;
        self.cache.resolve(address, size, content, force)?;
        if self.cache.statistics().mem_copies == before {
            self.report.resolves_reused += 1;
        } else {
            self.report.resolves_created += 1;
        }
        Ok(())
    }

    /// Gets the wall-clock time spent replaying
    pub fn get_execution_time(&self) -> &Duration {
        &self.replay_time
    }

    pub fn report(&self) -> &ReplayReport {
        &self.report
    }

    pub fn cache(&self) -> &Cache<HostMemory> {
        &self.cache
    }
}

/// Deterministic stand-in for the host data behind an address
fn content_for(address: Address, size: usize) -> Vec<u8> {
    let seed = address.get() as u8;
    (0..size).map(|i| seed.wrapping_add(i as u8)).collect()
}
