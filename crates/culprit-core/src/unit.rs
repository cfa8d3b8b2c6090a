//! Units, sequences and assertions.
//!
//! A [`Unit`] is an opaque piece of code. The core never looks inside it; it
//! only knows the unit's original position and how to write it into the
//! script handed to an isolated runner.

use std::io::{self, Write};
use std::ops::{Deref, Range};

use serde::{Deserialize, Serialize};

const SUMMARY_WIDTH: usize = 60;

/// One independently re-executable piece of code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    index: usize,
    line: usize,
    code: String,
}

impl Unit {
    /// Create a unit at `index` that starts on 1-based source `line`.
    #[must_use]
    pub fn new(index: usize, line: usize, code: impl Into<String>) -> Self {
        Self {
            index,
            line,
            code: code.into(),
        }
    }

    /// Zero-based position in the original sequence.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// 1-based line in the source artifact where the unit starts.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// First line of the code, truncated for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let first = self.code.lines().next().unwrap_or_default().trim_end();
        let more_lines = self.code.lines().nth(1).is_some();
        if first.chars().count() > SUMMARY_WIDTH {
            let cut: String = first.chars().take(SUMMARY_WIDTH).collect();
            format!("{cut}...")
        } else if more_lines {
            format!("{first} ...")
        } else {
            first.to_string()
        }
    }

    /// Serialize the unit into a runner script.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write_code(&self.code, out)
    }
}

/// Ordered, index-stable list of units.
///
/// Construction re-tags every unit so `sequence[i].index() == i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    units: Vec<Unit>,
}

impl Sequence {
    #[must_use]
    pub fn new(units: Vec<Unit>) -> Self {
        let units = units
            .into_iter()
            .enumerate()
            .map(|(index, unit)| Unit { index, ..unit })
            .collect();
        Self { units }
    }

    /// Build a sequence from bare code strings, one line number per unit.
    #[must_use]
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            codes
                .into_iter()
                .enumerate()
                .map(|(i, code)| Unit::new(i, i + 1, code))
                .collect(),
        )
    }

    /// Contiguous run of the sequence, in original order.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    #[must_use]
    pub fn run(&self, range: Range<usize>) -> &[Unit] {
        &self.units[range]
    }

    #[must_use]
    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }
}

impl Deref for Sequence {
    type Target = [Unit];

    fn deref(&self) -> &Self::Target {
        &self.units
    }
}

impl FromIterator<Unit> for Sequence {
    fn from_iter<T: IntoIterator<Item = Unit>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Predicate code evaluated after every unit of a test set has run.
///
/// Its printed value signals the fault: anything non-empty and not false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    code: String,
}

impl Assertion {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Serialize the assertion into a runner script.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        write_code(&self.code, out)
    }
}

/// Code followed by exactly one line terminator.
fn write_code(code: &str, out: &mut dyn Write) -> io::Result<()> {
    out.write_all(code.as_bytes())?;
    if !code.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}
