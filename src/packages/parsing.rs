//! Line classification shared by the backend parsers.
//!
//! Backends print human-readable tables. A table starts after a dashes
//! line; the line before the dashes is its header. Every non-blank line
//! after that is a candidate row, and a row only becomes a package when
//! it has enough columns and none of its fields is known noise.

use crate::utils::text;

/// Known non-package tokens a backend prints in table position.
#[derive(Debug, Clone, Copy)]
pub struct Blacklist {
    pub names: &'static [&'static str],
    pub ids: &'static [&'static str],
    pub versions: &'static [&'static str],
}

impl Blacklist {
    pub const EMPTY: Blacklist = Blacklist {
        names: &[],
        ids: &[],
        versions: &[],
    };

    fn listed(list: &[&str], value: &str) -> bool {
        let value = value.trim();
        list.iter().any(|entry| entry.trim() == value)
    }

    /// True when none of the fields is blacklisted.
    pub fn allows(&self, name: &str, id: &str, versions: &[&str]) -> bool {
        !Self::listed(self.names, name)
            && !Self::listed(self.ids, id)
            && !versions.iter().any(|v| Self::listed(self.versions, v))
    }
}

/// Tracks whether the dashes line of a table has been seen.
#[derive(Debug, Default)]
pub struct TableScanner {
    dashes_passed: bool,
    previous: Option<String>,
    header: Option<String>,
}

impl TableScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one cleaned line. Returns the line back when it is a data row.
    /// A later dashes line starts a new table with a new header.
    pub fn feed<'a>(&mut self, line: &'a str) -> Option<&'a str> {
        if line.trim().is_empty() {
            return None;
        }
        if text::is_separator_line(line) {
            self.dashes_passed = true;
            self.header = self.previous.take();
            return None;
        }
        self.previous = Some(line.to_string());
        self.dashes_passed.then_some(line)
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn in_table(&self) -> bool {
        self.dashes_passed
    }
}

/// Non-empty cells, for the minimum-column guard.
pub fn filled(cells: &[&str]) -> usize {
    cells.iter().filter(|cell| !cell.trim().is_empty()).count()
}

/// Value after `Key:` on a `Key: value` line, if the line has that key.
pub fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix(key)?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim())
}
