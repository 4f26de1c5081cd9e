//! Positioned, blocking I/O against the backing swap image.
//!
//! Workers call `pread`/`pwrite`-equivalent operations directly from their
//! own OS thread; no shared file offset is used, so concurrent access from
//! multiple threads is safe without additional synchronization.

use crate::error::{CoreError, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;

pub struct BackingFile {
    file: File,
}

impl BackingFile {
    /// Opens (creating if absent) the backing file at `path` for read/write.
    /// Failure here is fatal at startup (`IoOpenError`).
    pub fn open(path: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| CoreError::IoOpenError {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { file })
    }

    /// Positioned read. Returns the number of bytes actually read, which
    /// may be less than `buf.len()` near EOF — callers are responsible for
    /// zero-filling the remainder per the `PartialIo` contract.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    /// Positioned write. Returns the number of bytes actually written.
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write_at(buf, offset)
    }
}

/// Classifies a positioned write's outcome against the `expected` byte
/// count: a short write becomes `PartialIo`, an OS-level failure becomes
/// `IoWriteError`. Callers that get `Err` back keep the written-to page
/// dirty so a later flush can retry it.
pub fn classify_write(offset: u64, expected: usize, result: std::io::Result<usize>) -> Result<()> {
    match result {
        Ok(got) if got == expected => Ok(()),
        Ok(got) => Err(CoreError::PartialIo { offset, got, expected }),
        Err(source) => Err(CoreError::IoWriteError { offset, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn write_then_read_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let backing = BackingFile::open(tmp.path().to_str().unwrap()).unwrap();
        let data = [9u8; 128];
        backing.write_at(4096, &data).unwrap();
        let mut out = [0u8; 128];
        let n = backing.read_at(4096, &mut out).unwrap();
        assert_eq!(n, 128);
        assert_eq!(out, data);
    }

    #[test]
    fn read_past_eof_returns_zero_bytes() {
        let tmp = NamedTempFile::new().unwrap();
        let backing = BackingFile::open(tmp.path().to_str().unwrap()).unwrap();
        let mut out = [0xAAu8; 64];
        let n = backing.read_at(0, &mut out).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn classify_write_accepts_exact_length() {
        assert!(classify_write(0, 128, Ok(128)).is_ok());
    }

    #[test]
    fn classify_write_flags_short_write_as_partial_io() {
        let err = classify_write(4096, 128, Ok(64)).unwrap_err();
        assert!(matches!(err, CoreError::PartialIo { offset: 4096, got: 64, expected: 128 }));
    }

    #[test]
    fn classify_write_flags_os_error_as_io_write_error() {
        let os_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = classify_write(0, 128, Err(os_err)).unwrap_err();
        assert!(matches!(err, CoreError::IoWriteError { .. }));
    }

    #[test]
    fn open_nonexistent_parent_fails() {
        let err = BackingFile::open("/nonexistent-dir/does-not-exist/swap.img");
        assert!(err.is_err());
    }
}
