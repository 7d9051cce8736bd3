//! Archive extraction and routing.
//!
//! Each decrypted bundle is streamed through a tar reader into a dedicated
//! scratch subdirectory, sequentially (unlike fetch/decrypt, extraction is
//! not parallelized). The scratch tree is cleared before the first bundle of
//! a pass so nothing leaks between passes. The first directory entry of each
//! archive is recorded as the repository root, and the push destination is
//! decoded from the bundle's key. Any failure aborts the whole pass.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tar::EntryType;

use gitrelay_core::{route, DecryptedBundle, ExtractedArchive};

use crate::error::{io_err, SyncError};

/// Scratch subdirectory (under the configured workdir) holding unpacked
/// repositories for the current pass.
pub const SCRATCH_DIR: &str = "unpacked-repos";

/// Artifact entry some archivers emit for extended headers; skipped, never
/// materialized.
const PAX_GLOBAL_HEADER: &str = "pax_global_header";

/// Unpack every bundle and derive its push destination.
pub fn extract_all(
    bundles: &[DecryptedBundle],
    workdir: &Path,
) -> Result<Vec<ExtractedArchive>, SyncError> {
    let scratch = reset_scratch(workdir)?;

    let mut archives = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        archives.push(extract_one(bundle, &scratch)?);
    }
    Ok(archives)
}

/// Remove and recreate the scratch tree for this pass.
fn reset_scratch(workdir: &Path) -> Result<PathBuf, SyncError> {
    let scratch = workdir.join(SCRATCH_DIR);
    if scratch.exists() {
        fs::remove_dir_all(&scratch).map_err(|err| io_err(&scratch, err))?;
    }
    fs::create_dir_all(&scratch).map_err(|err| io_err(&scratch, err))?;
    Ok(scratch)
}

fn extract_one(bundle: &DecryptedBundle, scratch: &Path) -> Result<ExtractedArchive, SyncError> {
    // Each bundle unpacks under a directory named after its (still encoded)
    // object key, exactly as the producer shipped it.
    let dest = scratch.join(sanitized_key_dir(&bundle.key));
    fs::create_dir_all(&dest).map_err(|err| io_err(&dest, err))?;

    let mut archive = tar::Archive::new(&bundle.plaintext[..]);
    let mut repo_root: Option<PathBuf> = None;

    for entry in archive.entries().map_err(|err| archive_err(bundle, err))? {
        let mut entry = entry.map_err(|err| archive_err(bundle, err))?;
        let entry_path = entry
            .path()
            .map_err(|err| archive_err(bundle, err))?
            .into_owned();

        if entry_path.as_os_str() == PAX_GLOBAL_HEADER {
            continue;
        }
        reject_escaping_path(bundle, &entry_path)?;

        let target = dest.join(&entry_path);
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target).map_err(|err| io_err(&target, err))?;
                // Archives wrap the repo in one enclosing directory; the
                // first directory entry is the repository root.
                if repo_root.is_none() {
                    repo_root = Some(target.clone());
                }
            }
            EntryType::Regular => {
                if let Some(parent) = target.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent).map_err(|err| io_err(parent, err))?;
                    }
                }
                let mode = entry.header().mode().map_err(|err| archive_err(bundle, err))? & 0o777;
                let mut file = fs::File::create(&target).map_err(|err| io_err(&target, err))?;
                std::io::copy(&mut entry, &mut file).map_err(|err| io_err(&target, err))?;
                set_unix_mode(&target, mode)?;
            }
            other => {
                return Err(SyncError::ArchiveFormat {
                    key: bundle.key.clone(),
                    reason: format!(
                        "unsupported entry type {:?} at '{}'",
                        other,
                        entry_path.display()
                    ),
                });
            }
        }
    }

    let route = route::decode(&bundle.key)?;
    Ok(ExtractedArchive {
        local_dir: repo_root.unwrap_or(dest),
        route,
    })
}

/// Object keys are base64 and may contain `/`; flatten so each bundle stays
/// a single directory level under the scratch tree.
fn sanitized_key_dir(key: &str) -> String {
    key.replace('/', "_")
}

fn reject_escaping_path(bundle: &DecryptedBundle, entry_path: &Path) -> Result<(), SyncError> {
    let escapes = entry_path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(SyncError::ArchiveFormat {
            key: bundle.key.clone(),
            reason: format!("entry path escapes the archive: '{}'", entry_path.display()),
        });
    }
    Ok(())
}

fn archive_err(bundle: &DecryptedBundle, err: std::io::Error) -> SyncError {
    SyncError::ArchiveFormat {
        key: bundle.key.clone(),
        reason: err.to_string(),
    }
}

#[cfg(unix)]
fn set_unix_mode(path: &Path, mode: u32) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| io_err(path, err))
}

#[cfg(not(unix))]
fn set_unix_mode(_path: &Path, _mode: u32) -> Result<(), SyncError> {
    Ok(())
}
