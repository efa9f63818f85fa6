//! Golden file verification
//!
//! Compares rendered bytes against checked-in reference files. A missing
//! reference file is a failure, never an empty expectation.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A directory of reference files addressed by relative path
#[derive(Debug, Clone)]
pub struct GoldenDir {
    root: PathBuf,
}

impl GoldenDir {
    /// Use `root` as the base for relative paths
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative reference path
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Verify rendered output against `root/relative`
    pub fn verify(&self, relative: impl AsRef<Path>, actual: &[u8]) -> Result<()> {
        verify_golden(self.path(relative), actual)
    }
}

/// Verify that `actual` equals the contents of the file at `path`, byte for byte
pub fn verify_golden(path: impl AsRef<Path>, actual: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let expected = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::GoldenMissing {
                path: path.display().to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if expected == actual {
        return Ok(());
    }

    let expected = String::from_utf8_lossy(&expected).into_owned();
    let actual = String::from_utf8_lossy(actual).into_owned();
    Err(Error::GoldenMismatch {
        path: path.display().to_string(),
        line: first_differing_line(&expected, &actual),
        expected,
        actual,
    })
}

/// 1-based number of the first line that differs
fn first_differing_line(expected: &str, actual: &str) -> usize {
    let mut expected_lines = expected.split('\n');
    let mut actual_lines = actual.split('\n');
    let mut line = 1;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            _ => return line,
        }
    }
}
