//! Trust checks performed on a plugin file before it is mapped.
//!
//! A missing file is reported as [`EditorPluginError::NotFound`] so callers
//! probing for optional plugins can tell it apart from an insecure file.

use crate::error::{EditorPluginError, EditorPluginResult};
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tracing::debug;

/// Caller-supplied policy hook; `Err(reason)` vetoes loading
pub type FilePredicate = dyn Fn(&Path, &Metadata) -> Result<(), String>;

/// Owner UID that is always trusted
const ROOT_UID: u32 = 0;

/// Mode bits that make a file untrusted when an owner is required
const INSECURE_MODE_BITS: u32 = (libc::S_IWGRP | libc::S_IWOTH | libc::S_ISUID) as u32;

/// Validates plugin files
#[derive(Clone, Copy, Default)]
pub struct SecurityValidator<'a> {
    required_owner: Option<u32>,
    predicate: Option<&'a FilePredicate>,
}

impl<'a> SecurityValidator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the file to be owned by `uid` or root and not writable by others
    pub fn required_owner(mut self, uid: Option<u32>) -> Self {
        self.required_owner = uid;
        self
    }

    pub fn predicate(mut self, predicate: Option<&'a FilePredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Decide whether `path` is safe to load. Read-only.
    pub fn validate(&self, path: &Path) -> EditorPluginResult<()> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if is_missing(&e) => {
                return Err(EditorPluginError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(untrusted(path, format!("cannot stat file: {}", e))),
        };

        if !metadata.is_file() {
            return Err(untrusted(path, "not a regular file"));
        }

        if !path.is_absolute() {
            return Err(untrusted(path, "path is not absolute"));
        }

        if let Some(owner) = self.required_owner {
            let uid = metadata.uid();
            if uid != ROOT_UID && uid != owner {
                return Err(untrusted(
                    path,
                    format!("invalid owner (uid {}, expected {} or root)", uid, owner),
                ));
            }
            if metadata.mode() & INSECURE_MODE_BITS != 0 {
                return Err(untrusted(
                    path,
                    format!("invalid permissions ({:o})", metadata.mode() & 0o7777),
                ));
            }
        }

        if let Some(predicate) = self.predicate {
            predicate(path, &metadata).map_err(|reason| EditorPluginError::RejectedByPolicy {
                path: path.to_path_buf(),
                reason,
            })?;
        }

        debug!("Plugin file {} passed security checks", path.display());
        Ok(())
    }
}

fn is_missing(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::NotFound || error.raw_os_error() == Some(libc::ENOTDIR)
}

fn untrusted(path: &Path, reason: impl Into<String>) -> EditorPluginError {
    EditorPluginError::UntrustedFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Effective UID of the current process
pub fn current_uid() -> u32 {
    unsafe { libc::geteuid() }
}
