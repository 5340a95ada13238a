//! Access trace loading.
//!
//! A trace is a text file with one memory operation per line:
//!
//! ```text
//! # core kind addr [size]
//! 0 L 0x1000 8
//! 1 S 0x1008 8
//! 1 S 0x2000
//! ```
//!
//! Addresses and sizes are decimal or `0x`-prefixed hex. Kinds are `L`
//! (load), `S` (store) or `I` (invalidate). A missing size means a
//! single-line access. Blank lines and `#` comments are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{AccessKind, TraceError};

/// One recorded memory operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOp {
    /// Core that issued the operation.
    pub core: usize,
    /// Operation kind.
    pub kind: AccessKind,
    /// First byte accessed.
    pub addr: u64,
    /// Width in bytes; `None` for a single-line access.
    pub size: Option<u32>,
    /// One-based source line, 0 when not read from a file.
    #[serde(default)]
    pub line: usize,
}

impl TraceOp {
    /// Operation spanning `[addr, addr + size)`.
    pub const fn new(core: usize, kind: AccessKind, addr: u64, size: u32) -> Self {
        Self {
            core,
            kind,
            addr,
            size: Some(size),
            line: 0,
        }
    }

    /// Operation on the single line containing `addr`.
    pub const fn single_line(core: usize, kind: AccessKind, addr: u64) -> Self {
        Self {
            core,
            kind,
            addr,
            size: None,
            line: 0,
        }
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
pub fn parse_number(text: &str) -> Option<u64> {
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => text.replace('_', "").parse().ok(),
    }
}

fn parse_line(text: &str, line: usize) -> Result<Option<TraceOp>, TraceError> {
    let content = text.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }

    let fail = |reason: String| TraceError::Parse { line, reason };
    let mut fields = content.split_whitespace();

    let core = fields
        .next()
        .and_then(|f| f.parse::<usize>().ok())
        .ok_or_else(|| fail("expected core number".to_owned()))?;
    let kind = fields
        .next()
        .ok_or_else(|| fail("missing access kind".to_owned()))?
        .parse::<AccessKind>()
        .map_err(&fail)?;
    let addr_field = fields
        .next()
        .ok_or_else(|| fail("missing address".to_owned()))?;
    let addr = parse_number(addr_field)
        .ok_or_else(|| fail(format!("invalid address `{addr_field}`")))?;
    let size = match fields.next() {
        None => None,
        Some(field) => Some(
            parse_number(field)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| fail(format!("invalid size `{field}`")))?,
        ),
    };
    if let Some(extra) = fields.next() {
        return Err(fail(format!("unexpected trailing field `{extra}`")));
    }

    Ok(Some(TraceOp {
        core,
        kind,
        addr,
        size,
        line,
    }))
}

/// Reads a trace from any buffered reader.
///
/// # Errors
///
/// Returns [`TraceError::Io`] on read failure or [`TraceError::Parse`] for
/// the first malformed line.
pub fn read_trace<R: BufRead>(input: R) -> Result<Vec<TraceOp>, TraceError> {
    let mut ops = Vec::new();
    for (index, text) in input.lines().enumerate() {
        if let Some(op) = parse_line(&text?, index + 1)? {
            ops.push(op);
        }
    }
    Ok(ops)
}

/// Reads a trace file.
///
/// # Errors
///
/// Same as [`read_trace`], plus failure to open the file.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceOp>, TraceError> {
    let file = File::open(path)?;
    read_trace(BufReader::new(file))
}
