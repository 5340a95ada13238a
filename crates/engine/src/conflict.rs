//! Conflict records for layout repair.
//!
//! A structure-layout repair pass consumes detected false sharing as one text
//! record per conflict:
//!
//! ```text
//! <variable> <offset> <size> <variable> <offset> <size> <count>
//! ```
//!
//! where each `(variable, offset, size)` triple names the symbol an access
//! landed in, the byte offset of the access inside that symbol, and the access
//! width. This module converts interference counts into such records, given a
//! resolver from addresses to symbols, and reads and writes the format.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::InterferenceCounts;
use crate::common::TraceError;

/// One side of a conflict: an access inside a named variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheLineEntry {
    /// Symbol the access landed in.
    pub variable: String,
    /// Byte offset of the access inside the variable.
    pub offset: u64,
    /// Access width in bytes.
    pub size: u64,
}

/// Two accesses from different cores that shared a cache line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// First access of the pair (the lower address).
    pub first: CacheLineEntry,
    /// Second access of the pair (the higher address).
    pub second: CacheLineEntry,
    /// Number of times the collision was observed.
    pub count: u64,
}

impl fmt::Display for CacheLineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.offset, self.size)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first, self.second, self.count)
    }
}

fn number(field: Option<&str>, what: &str) -> Result<u64, String> {
    let field = field.ok_or_else(|| format!("missing {what}"))?;
    field
        .parse()
        .map_err(|_| format!("invalid {what} `{field}`"))
}

fn entry<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Result<CacheLineEntry, String> {
    let variable = fields.next().ok_or("missing variable name")?.to_owned();
    let offset = number(fields.next(), "offset")?;
    let size = number(fields.next(), "size")?;
    Ok(CacheLineEntry {
        variable,
        offset,
        size,
    })
}

impl FromStr for Conflict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let first = entry(&mut fields)?;
        let second = entry(&mut fields)?;
        let count = number(fields.next(), "count")?;
        if let Some(extra) = fields.next() {
            return Err(format!("unexpected trailing field `{extra}`"));
        }
        Ok(Self {
            first,
            second,
            count,
        })
    }
}

/// Turns interference counts into conflict records.
///
/// `resolve` maps an address to the access it belongs to; pairs where either
/// address does not resolve (stack, heap, unknown symbols) are skipped.
/// Records are ordered by descending count.
pub fn conflicts_from_interference<F>(counts: &InterferenceCounts, mut resolve: F) -> Vec<Conflict>
where
    F: FnMut(u64) -> Option<CacheLineEntry>,
{
    counts
        .ranked()
        .into_iter()
        .filter_map(|(key, count)| {
            Some(Conflict {
                first: resolve(key.lower)?,
                second: resolve(key.upper)?,
                count,
            })
        })
        .collect()
}

/// Writes one record per line.
///
/// # Errors
///
/// Propagates any I/O error from `out`.
pub fn write_conflicts<W: Write>(mut out: W, conflicts: &[Conflict]) -> io::Result<()> {
    for conflict in conflicts {
        writeln!(out, "{conflict}")?;
    }
    out.flush()
}

/// Reads records, one per line; blank lines are skipped.
///
/// # Errors
///
/// Returns [`TraceError::Io`] on read failure and [`TraceError::Parse`] with
/// the one-based line number for a malformed record.
pub fn read_conflicts<R: BufRead>(input: R) -> Result<Vec<Conflict>, TraceError> {
    let mut conflicts = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let conflict = line.parse().map_err(|reason| TraceError::Parse {
            line: index + 1,
            reason,
        })?;
        conflicts.push(conflict);
    }
    Ok(conflicts)
}
