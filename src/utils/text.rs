//! Text normalization shared by every backend parser.

use regex::Regex;
use std::sync::LazyLock;

/// CSI escape sequences (colors, cursor movement) emitted by PowerShell and scoop.
static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("Invalid regex pattern"));

/// Package-id suffixes that only describe the installer flavour.
const FLAVOUR_SUFFIXES: &[&str] = &[".install", ".portable"];

/// Strip ANSI escape codes from a string
pub fn strip_ansi(input: &str) -> String {
    ANSI_ESCAPE.replace_all(input, "").into_owned()
}

/// Keep only what a terminal would show after carriage-return redraws.
///
/// Progress bars rewrite the same line with `\r`; the last segment wins.
pub fn visible_segment(line: &str) -> &str {
    line.rsplit('\r')
        .find(|segment| !segment.trim().is_empty())
        .unwrap_or("")
}

/// Full normalization for a single raw output line.
pub fn clean_line(raw: &str) -> String {
    strip_ansi(visible_segment(raw)).trim().to_string()
}

/// Turn a package id into a readable display name.
///
/// `python-dateutil` -> `Python Dateutil`, `extras/vlc` -> `Vlc`,
/// `7zip.install` -> `7zip`.
pub fn format_id_as_name(id: &str) -> String {
    let mut base = id.rsplit(['/', '\\']).next().unwrap_or(id).trim();
    for suffix in FLAVOUR_SUFFIXES {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped;
        }
    }

    base.split(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split on runs of spaces/tabs, dropping empty cells.
pub fn split_whitespace_columns(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Split on a single-character delimiter, trimming cells and dropping empty ones.
pub fn split_delimited(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Table header underline (`-------  ----  ---`).
pub fn is_separator_line(line: &str) -> bool {
    line.contains("----")
}

/// Fixed-width column layout recovered from a header line.
///
/// Winget pads every column to its widest cell, so the start offset of each
/// header word is the start offset of that column in every data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    starts: Vec<usize>,
}

impl ColumnLayout {
    /// Derive column starts (char offsets) from a header such as
    /// `Name      Id        Version   Source`.
    pub fn from_header(header: &str) -> Option<Self> {
        let mut starts = Vec::new();
        let mut previous_is_space = true;
        for (index, c) in header.chars().enumerate() {
            if !c.is_whitespace() && previous_is_space {
                starts.push(index);
            }
            previous_is_space = c.is_whitespace();
        }

        if starts.len() < 2 {
            return None;
        }
        Some(Self { starts })
    }

    pub fn column_count(&self) -> usize {
        self.starts.len()
    }

    /// Cut a data row into trimmed cells using the header offsets.
    pub fn slice<'a>(&self, row: &'a str) -> Vec<&'a str> {
        let offsets: Vec<usize> = row.char_indices().map(|(byte, _)| byte).collect();
        let byte_at = |char_index: usize| offsets.get(char_index).copied().unwrap_or(row.len());

        self.starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let from = byte_at(start);
                let to = self
                    .starts
                    .get(i + 1)
                    .map(|&next| byte_at(next))
                    .unwrap_or(row.len());
                if from >= to {
                    ""
                } else {
                    row[from..to].trim()
                }
            })
            .collect()
    }
}
