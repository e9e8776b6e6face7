//! Disk spooling for disk-mode transfers.
//!
//! The spool directory is shared with the recipient; file names must be
//! fresh at creation time. Candidates are drawn at random and opened with
//! exclusive-create semantics, so a colliding name fails the open and a new
//! candidate is drawn; there is no stat-then-open window.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, error};

use crate::error::{AppResult, LinkError};

use super::SPOOL_NAME_SPACE;

/// Prefix of every spool file name.
pub const SPOOL_FILE_PREFIX: &str = "largeBlob";

/// Build the spool file name for a numeric suffix.
pub fn spool_file_name(num: u64) -> String {
    format!("{SPOOL_FILE_PREFIX}.{num}")
}

/// Write `payload` to a freshly-named file in `dir`.
///
/// Returns the bare file name the recipient should look for. An unusable
/// directory is logged and aborts this attempt without retry.
pub fn spool_payload(dir: &Path, payload: &[u8]) -> AppResult<String> {
    if !dir.is_dir() {
        error!(dir = %dir.display(), "could not access blob directory");
        return Err(LinkError::SpoolDirUnavailable(dir.to_path_buf()));
    }

    let mut rng = rand::thread_rng();
    loop {
        let num: u64 = rng.gen_range(0..SPOOL_NAME_SPACE);
        let filename = spool_file_name(num);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&filename))
        {
            Ok(mut file) => {
                file.write_all(payload)?;
                file.sync_all()?;
                debug!(filename, bytes = payload.len(), "spooled payload");
                return Ok(filename);
            }
            // Name already taken; draw another.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Full path of a spool file inside the blob directory.
pub fn spool_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spool_writes_payload_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let payload = b"opaque payload \x00\x01\x02";

        let filename = spool_payload(dir.path(), payload).unwrap();
        assert!(filename.starts_with("largeBlob."));

        let written = std::fs::read(dir.path().join(&filename)).unwrap();
        assert_eq!(written, payload);
    }

    #[test]
    fn test_spool_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = spool_payload(dir.path(), b"a").unwrap();
        let b = spool_payload(dir.path(), b"b").unwrap();
        assert_ne!(a, b);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_directory_is_fatal_for_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = spool_payload(&missing, b"payload").unwrap_err();
        assert!(matches!(err, LinkError::SpoolDirUnavailable(_)));
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(spool_file_name(42), "largeBlob.42");
    }
}
