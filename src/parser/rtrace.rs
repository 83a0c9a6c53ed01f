//! Reader for the sp-rtrace text log format.
//!
//! Feeds resource/context declarations and allocation events into a
//! [`TraceData`]. Backtrace records (lines starting with a TAB) and
//! everything unrecognized is skipped.

use crate::trace::{Timestamp, TraceData};
use crate::utils::error::ParseError;
use log::debug;
use regex::{Captures, Regex};
use std::io::BufRead;

const ALLOC_PATTERN: &str = r"^([0-9]+)\.(?: @([0-9a-fA-F]+))? [^\[]*\[([^\]]+)\][^(<]+(?:<([^>]+)>)?\(([^)]+)\) = (0x[a-fA-F0-9]+)(.*)$";
const FREE_PATTERN: &str = r"^([0-9]+)\.(?: @([0-9a-fA-F]+))? [^\[]*\[([^\]]+)\][^(<]+(?:<([^>]+)>)?\((0x[a-fA-F0-9]+)\)$";
const RESOURCE_PATTERN: &str = r"^<([0-9a-z]+)> : ([^ ]+) \(([^)]+)\)";
const CONTEXT_PATTERN: &str = r"^@ ([0-9a-fA-F]+) : (.*)$";

/// Counters of a parsed log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub allocs: usize,
    pub frees: usize,
    pub resources: usize,
    pub contexts: usize,
    /// Backtrace and unrecognized lines
    pub skipped: usize,
}

/// Compiled line patterns
#[derive(Debug, Clone)]
pub struct TraceParser {
    alloc: Regex,
    free: Regex,
    resource: Regex,
    context: Regex,
}

impl TraceParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            alloc: Regex::new(ALLOC_PATTERN)?,
            free: Regex::new(FREE_PATTERN)?,
            resource: Regex::new(RESOURCE_PATTERN)?,
            context: Regex::new(CONTEXT_PATTERN)?,
        })
    }

    /// Read a whole log into `trace`
    ///
    /// # Errors
    /// * `ParseError::Io` - Reading failed
    /// * `ParseError::InvalidLine` - Malformed timestamp, size or context
    /// * `ParseError::Trace` - Event for an undeclared resource type
    pub fn read(&self, reader: impl BufRead, trace: &mut TraceData) -> Result<ParseStats, ParseError> {
        let mut stats = ParseStats::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            stats.lines += 1;
            self.read_line(number + 1, line.trim_end_matches('\r'), trace, &mut stats)?;
        }

        debug!(
            "Parsed {} lines: {} allocs, {} frees, {} resources, {} contexts",
            stats.lines, stats.allocs, stats.frees, stats.resources, stats.contexts
        );
        Ok(stats)
    }

    fn read_line(
        &self,
        number: usize,
        line: &str,
        trace: &mut TraceData,
        stats: &mut ParseStats,
    ) -> Result<(), ParseError> {
        if line.starts_with('\t') {
            stats.skipped += 1;
            return Ok(());
        }

        if let Some(caps) = self.alloc.captures(line) {
            let (index, context, timestamp) = event_header(number, &caps)?;
            let size = caps[5]
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(number, format!("invalid size '{}'", &caps[5])))?;
            let resource = caps.get(4).map(|m| m.as_str());
            trace.register_alloc(index, context, timestamp, resource, &caps[6], size)?;
            stats.allocs += 1;
            return Ok(());
        }

        if let Some(caps) = self.free.captures(line) {
            let (index, context, timestamp) = event_header(number, &caps)?;
            let resource = caps.get(4).map(|m| m.as_str());
            trace.register_free(index, context, timestamp, resource, &caps[5])?;
            stats.frees += 1;
            return Ok(());
        }

        if let Some(caps) = self.resource.captures(line) {
            trace.register_resource(&caps[2]);
            stats.resources += 1;
            return Ok(());
        }

        if let Some(caps) = self.context.captures(line) {
            let value = u32::from_str_radix(&caps[1], 16)
                .map_err(|_| invalid(number, format!("invalid context mask '{}'", &caps[1])))?;
            trace.register_context(value, &caps[2]);
            stats.contexts += 1;
            return Ok(());
        }

        stats.skipped += 1;
        Ok(())
    }
}

/// Index, context mask and timestamp shared by both event patterns
fn event_header(number: usize, caps: &Captures<'_>) -> Result<(u64, u32, Timestamp), ParseError> {
    let index = caps[1]
        .parse::<u64>()
        .map_err(|_| invalid(number, format!("invalid index '{}'", &caps[1])))?;
    let context = match caps.get(2) {
        Some(m) => u32::from_str_radix(m.as_str(), 16)
            .map_err(|_| invalid(number, format!("invalid context mask '{}'", m.as_str())))?,
        None => 0,
    };
    let timestamp = caps[3]
        .parse::<Timestamp>()
        .map_err(|e| invalid(number, e.to_string()))?;
    Ok((index, context, timestamp))
}

fn invalid(line: usize, reason: String) -> ParseError {
    ParseError::InvalidLine { line, reason }
}

/// Parse an sp-rtrace log into `trace`
///
/// **Public** - main entry point for ingestion
///
/// # Arguments
/// * `reader` - Log text
/// * `trace` - Destination, events are appended unsorted
///
/// # Returns
/// Line and event counters
///
/// # Example
/// ```ignore
/// let mut trace = TraceData::new();
/// let stats = parse_trace(BufReader::new(File::open("app.rtrace.txt")?), &mut trace)?;
/// trace.sort();
/// ```
pub fn parse_trace(reader: impl BufRead, trace: &mut TraceData) -> Result<ParseStats, ParseError> {
    TraceParser::new()?.read(reader, trace)
}
