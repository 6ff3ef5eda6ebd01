//! On-disk catalog cache, one flat file per backend.
//!
//! Each line is `name,id,version,source` with `%`, `,`, CR and LF
//! percent-escaped. Readers hold a shared lock and writers an exclusive
//! lock on a sidecar `.lock` file. Writes land in a temp file that is
//! renamed over the cache file, so readers never see a torn file.

pub mod catalog;

use crate::core::{Backend, Package};
use crate::error::{PkgBridgeError, Result};
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const CACHE_FILE_SUFFIX: &str = "CachedPackages";

/// Flattened projection of a `Package` for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheRow {
    pub name: String,
    pub id: String,
    pub version: String,
    pub source: String,
}

impl CacheRow {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version: version.into(),
            source: source.into(),
        }
    }

    /// Identity within one backend's cache.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.source)
    }

    pub fn to_line(&self) -> String {
        [&self.name, &self.id, &self.version, &self.source]
            .iter()
            .map(|field| escape(field))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse one stored line; anything without exactly four fields is dropped.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        let [name, id, version, source] = fields.as_slice() else {
            return None;
        };
        if id.is_empty() {
            return None;
        }
        Some(Self::new(
            unescape(name),
            unescape(id),
            unescape(version),
            unescape(source),
        ))
    }

    pub fn into_package(self, backend: Backend) -> Package {
        Package::new(self.name, self.id, self.version, self.source, backend)
    }
}

impl From<&Package> for CacheRow {
    fn from(package: &Package) -> Self {
        Self::new(
            package.name.clone(),
            package.id.clone(),
            package.version.clone(),
            package.source.clone(),
        )
    }
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = match tail.get(..3) {
            Some("%25") => Some('%'),
            Some("%2C") => Some(','),
            Some("%0D") => Some('\r'),
            Some("%0A") => Some('\n'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[3..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// What a cache read found. Absent and empty are different states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSnapshot {
    Absent,
    Empty,
    Rows(Vec<CacheRow>),
}

/// Union of both sets keyed on (id, source): every fresh row, plus any old
/// row the fresh scrape did not report. No key appears twice.
pub fn merge(existing: Vec<CacheRow>, fresh: Vec<CacheRow>) -> Vec<CacheRow> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(existing.len() + fresh.len());
    let mut merged = Vec::with_capacity(existing.len().max(fresh.len()));

    for row in fresh.into_iter().chain(existing) {
        if seen.insert((row.id.clone(), row.source.clone())) {
            merged.push(row);
        }
    }
    merged
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, backend: Backend) -> PathBuf {
        self.dir
            .join(format!("{}{}", backend.display_name(), CACHE_FILE_SUFFIX))
    }

    fn lock_path(&self, backend: Backend) -> PathBuf {
        self.dir
            .join(format!("{}{}.lock", backend.display_name(), CACHE_FILE_SUFFIX))
    }

    fn lock(&self, backend: Backend, exclusive: bool) -> Result<File> {
        fs::create_dir_all(&self.dir).map_err(|e| PkgBridgeError::IoError {
            path: self.dir.clone(),
            source: e,
        })?;

        let lock_path = self.lock_path(backend);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| PkgBridgeError::IoError {
                path: lock_path.clone(),
                source: e,
            })?;

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        };
        locked.map_err(|e| {
            PkgBridgeError::LockError(format!("{}: {}", lock_path.display(), e))
        })?;

        Ok(file)
    }

    pub fn read(&self, backend: Backend) -> Result<CacheSnapshot> {
        if !self.path_for(backend).exists() {
            return Ok(CacheSnapshot::Absent);
        }
        let _lock = self.lock(backend, false)?;
        self.read_unlocked(backend)
    }

    fn read_unlocked(&self, backend: Backend) -> Result<CacheSnapshot> {
        let path = self.path_for(backend);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheSnapshot::Absent),
            Err(e) => return Err(PkgBridgeError::IoError { path, source: e }),
        };

        let rows: Vec<CacheRow> = content.lines().filter_map(CacheRow::from_line).collect();
        if rows.is_empty() {
            Ok(CacheSnapshot::Empty)
        } else {
            Ok(CacheSnapshot::Rows(rows))
        }
    }

    /// Replace the cache for `backend` with exactly `rows`.
    pub fn write(&self, backend: Backend, rows: &[CacheRow]) -> Result<()> {
        let _lock = self.lock(backend, true)?;
        self.write_unlocked(backend, rows)
    }

    fn write_unlocked(&self, backend: Backend, rows: &[CacheRow]) -> Result<()> {
        let path = self.path_for(backend);
        let tmp_path = path.with_extension("tmp");

        let mut content = String::new();
        for row in rows {
            content.push_str(&row.to_line());
            content.push('\n');
        }

        let mut tmp_file = File::create(&tmp_path).map_err(|e| PkgBridgeError::IoError {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &path).map_err(|e| PkgBridgeError::IoError { path, source: e })
    }

    /// Merge freshly scraped rows into the stored ones under one exclusive lock.
    /// Returns the number of rows now cached.
    pub fn refresh(&self, backend: Backend, fresh: Vec<CacheRow>) -> Result<usize> {
        let _lock = self.lock(backend, true)?;
        let existing = match self.read_unlocked(backend)? {
            CacheSnapshot::Rows(rows) => rows,
            CacheSnapshot::Absent | CacheSnapshot::Empty => Vec::new(),
        };
        let merged = merge(existing, fresh);
        self.write_unlocked(backend, &merged)?;
        Ok(merged.len())
    }

    /// Delete cached catalogs. `None` clears every backend.
    pub fn clear(&self, backend: Option<Backend>) -> Result<usize> {
        let targets: Vec<Backend> = match backend {
            Some(backend) => vec![backend],
            None => Backend::ALL.to_vec(),
        };

        let mut removed = 0;
        for backend in targets {
            let path = self.path_for(backend);
            if !path.exists() {
                continue;
            }
            let _lock = self.lock(backend, true)?;
            fs::remove_file(&path).map_err(|e| PkgBridgeError::IoError {
                path: path.clone(),
                source: e,
            })?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
