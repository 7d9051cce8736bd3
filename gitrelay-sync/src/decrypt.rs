//! Concurrent decryption of fetched bundles with an age X25519 identity.
//!
//! The identity is loaded and unlocked once per call; an unreadable key file
//! or wrong passphrase fails before any per-object work starts. Each bundle
//! is decrypted on its own blocking worker. The collector returns the first
//! error it sees, after setting a shared cancellation flag (so undecrypted
//! stragglers skip their work) and draining every worker.

use std::io::Read;
use std::iter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use age::armor::ArmoredReader;
use age::secrecy::Secret;
use age::x25519;
use tokio::sync::mpsc;

use gitrelay_core::{DecryptedBundle, EncryptedBundle};

use crate::error::{io_err, SyncError};

const BINARY_AGE_MAGIC: &[u8] = b"age-encryption.org/v1";
const ARMOR_BEGIN: &[u8] = b"-----BEGIN AGE ENCRYPTED FILE-----";

/// Read and unlock the private decryption identity.
///
/// Accepts a plaintext age identity file or one that was itself encrypted
/// with a passphrase (armored or binary). Comment lines and blanks are
/// ignored; the first X25519 secret key wins.
pub fn load_identity(path: &Path, passphrase: &str) -> Result<x25519::Identity, SyncError> {
    let raw = std::fs::read(path).map_err(|err| io_err(path, err))?;

    let contents = if is_age_encrypted(&raw) {
        unlock_identity_file(&raw, passphrase)?
    } else {
        raw
    };
    let text = String::from_utf8(contents).map_err(|_| SyncError::KeyMaterial {
        reason: format!("identity file {} is not UTF-8", path.display()),
    })?;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Ok(identity) = line.parse::<x25519::Identity>() {
            return Ok(identity);
        }
    }

    Err(SyncError::KeyMaterial {
        reason: format!("no X25519 identity found in {}", path.display()),
    })
}

fn is_age_encrypted(raw: &[u8]) -> bool {
    raw.starts_with(BINARY_AGE_MAGIC) || raw.trim_ascii_start().starts_with(ARMOR_BEGIN)
}

fn unlock_identity_file(raw: &[u8], passphrase: &str) -> Result<Vec<u8>, SyncError> {
    let decryptor =
        age::Decryptor::new(ArmoredReader::new(raw)).map_err(|err| SyncError::KeyMaterial {
            reason: format!("unreadable encrypted identity file: {err}"),
        })?;
    let decryptor = match decryptor {
        age::Decryptor::Passphrase(d) => d,
        _ => {
            return Err(SyncError::KeyMaterial {
                reason: "identity file is recipient-encrypted, expected a passphrase".to_string(),
            })
        }
    };

    let mut reader = decryptor
        .decrypt(&Secret::new(passphrase.to_owned()), None)
        .map_err(|err| SyncError::KeyMaterial {
            reason: format!("failed to unlock identity file: {err}"),
        })?;
    let mut contents = Vec::new();
    reader
        .read_to_end(&mut contents)
        .map_err(|err| SyncError::KeyMaterial {
            reason: format!("failed to read unlocked identity: {err}"),
        })?;
    Ok(contents)
}

/// Decrypt every bundle with independent concurrent workers.
///
/// Output preserves no particular order relative to input; each output key
/// matches exactly one input key.
pub async fn decrypt_all(
    bundles: Vec<EncryptedBundle>,
    identity: Arc<x25519::Identity>,
) -> Result<Vec<DecryptedBundle>, SyncError> {
    if bundles.is_empty() {
        return Ok(Vec::new());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::channel::<Result<DecryptedBundle, SyncError>>(bundles.len());

    let expected = bundles.len();
    for bundle in bundles {
        let identity = Arc::clone(&identity);
        let cancelled = Arc::clone(&cancelled);
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            if cancelled.load(Ordering::Relaxed) {
                // A sibling already failed; skip the work, let the channel
                // close once all workers return.
                return;
            }
            let _ = tx.blocking_send(decrypt_one(&bundle, identity.as_ref()));
        });
    }
    drop(tx);

    let mut decrypted = Vec::with_capacity(expected);
    let mut first_error: Option<SyncError> = None;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(bundle) => decrypted.push(bundle),
            Err(err) => {
                if first_error.is_none() {
                    cancelled.store(true, Ordering::Relaxed);
                    first_error = Some(err);
                } else {
                    tracing::debug!(error = %err, "additional decrypt failure after first error");
                }
            }
        }
    }

    match first_error {
        None => Ok(decrypted),
        Some(err) => Err(err),
    }
}

fn decrypt_one(
    bundle: &EncryptedBundle,
    identity: &x25519::Identity,
) -> Result<DecryptedBundle, SyncError> {
    let decryptor =
        age::Decryptor::new(&bundle.ciphertext[..]).map_err(|err| SyncError::Decrypt {
            key: bundle.key.clone(),
            reason: err.to_string(),
        })?;
    let decryptor = match decryptor {
        age::Decryptor::Recipients(d) => d,
        _ => {
            return Err(SyncError::Decrypt {
                key: bundle.key.clone(),
                reason: "object is passphrase-encrypted, expected recipient encryption"
                    .to_string(),
            })
        }
    };

    let mut reader = decryptor
        .decrypt(iter::once(identity as &dyn age::Identity))
        .map_err(|err| SyncError::Decrypt {
            key: bundle.key.clone(),
            reason: err.to_string(),
        })?;
    let mut plaintext = Vec::new();
    reader
        .read_to_end(&mut plaintext)
        .map_err(|err| SyncError::Decrypt {
            key: bundle.key.clone(),
            reason: err.to_string(),
        })?;

    Ok(DecryptedBundle {
        key: bundle.key.clone(),
        plaintext,
    })
}
