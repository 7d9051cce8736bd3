//! The pass orchestrator: listing → fetch → decrypt → extract →
//! (dry-run report | publish) → cache commit.
//!
//! One pass is fully sequential stage-to-stage; only fetch and decrypt fan
//! out internally. The change cache commits only when every stage of the
//! pass succeeded, so a failed pass leaves nothing behind and the next pass
//! re-attempts the full batch from scratch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use gitrelay_core::{ChangeCache, EncryptedBundle, ExtractedArchive};

use crate::decrypt;
use crate::error::SyncError;
use crate::extract;
use crate::fetch;
use crate::publish::Publisher;
use crate::store::ObjectStore;

/// Deadline bounding the listing+fetch stages of one pass. Decrypt, extract,
/// and publish are not cancellable mid-flight and run unbounded.
pub const DEFAULT_LIST_FETCH_DEADLINE: Duration = Duration::from_secs(20);

/// Destination a pass resolved for one bundle, reported on success and in
/// dry-run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPush {
    pub destination: String,
    pub branch: String,
    pub short_sha: String,
}

/// Result of one completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The changed-key set was empty; no downstream work happened.
    UpToDate,
    /// Dry-run: extraction happened, destinations were resolved, nothing
    /// was pushed or committed.
    DryRun(Vec<PlannedPush>),
    /// Every bundle was pushed and the cache committed.
    Published(Vec<PlannedPush>),
}

/// The incremental sync pipeline over an object store and a publisher.
pub struct Pipeline<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    private_key_path: PathBuf,
    private_key_passphrase: String,
    workdir: PathBuf,
    list_fetch_deadline: Duration,
    /// Base URL used for log/report destinations, matching what the
    /// publisher composes (minus credentials).
    destination_base: String,
}

impl<S: ObjectStore, P: Publisher> Pipeline<S, P> {
    pub fn new(
        store: S,
        publisher: P,
        private_key_path: PathBuf,
        private_key_passphrase: String,
        workdir: PathBuf,
        destination_base: String,
    ) -> Self {
        Self {
            store: Arc::new(store),
            publisher: Arc::new(publisher),
            private_key_path,
            private_key_passphrase,
            workdir,
            list_fetch_deadline: DEFAULT_LIST_FETCH_DEADLINE,
            destination_base: destination_base.trim_end_matches('/').to_string(),
        }
    }

    /// Override the listing+fetch deadline (tests, unusual deployments).
    pub fn with_list_fetch_deadline(mut self, deadline: Duration) -> Self {
        self.list_fetch_deadline = deadline;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Drive one full pass. Pending cache entries are discarded on every
    /// path except a fully successful publish, which commits them. The
    /// pending map is replaced up front so fetch workers that outlived a
    /// previous pass's deadline cannot write into this one.
    pub async fn run_pass(
        &self,
        cache: &mut ChangeCache,
        dry_run: bool,
    ) -> Result<PassOutcome, SyncError> {
        cache.begin_pass();
        let result = self.run_pass_inner(cache, dry_run).await;
        match &result {
            Ok(PassOutcome::Published(_)) => {}
            _ => cache.discard_pending(),
        }
        result
    }

    async fn run_pass_inner(
        &self,
        cache: &mut ChangeCache,
        dry_run: bool,
    ) -> Result<PassOutcome, SyncError> {
        let Some(bundles) = self.list_and_fetch(cache).await? else {
            tracing::info!("everything is up to date");
            return Ok(PassOutcome::UpToDate);
        };
        tracing::info!(count = bundles.len(), "fetched changed objects");

        let key_path = self.private_key_path.clone();
        let passphrase = self.private_key_passphrase.clone();
        let identity =
            tokio::task::spawn_blocking(move || decrypt::load_identity(&key_path, &passphrase))
                .await
                .map_err(|_| SyncError::Join { stage: "identity" })??;

        let decrypted = decrypt::decrypt_all(bundles, Arc::new(identity)).await?;
        tracing::info!(count = decrypted.len(), "decrypted bundles");

        let workdir = self.workdir.clone();
        let archives =
            tokio::task::spawn_blocking(move || extract::extract_all(&decrypted, &workdir))
                .await
                .map_err(|_| SyncError::Join { stage: "extract" })??;

        let planned = self.plan(&archives);
        if dry_run {
            for push in &planned {
                tracing::info!(
                    destination = %push.destination,
                    branch = %push.branch,
                    short_sha = %push.short_sha,
                    "[dry-run] would push",
                );
            }
            return Ok(PassOutcome::DryRun(planned));
        }

        let publisher = Arc::clone(&self.publisher);
        tokio::task::spawn_blocking(move || {
            for archive in &archives {
                publisher.publish(archive)?;
            }
            Ok::<(), SyncError>(())
        })
        .await
        .map_err(|_| SyncError::Join { stage: "publish" })??;

        cache.commit();
        Ok(PassOutcome::Published(planned))
    }

    /// LISTING + FETCHING under one deadline. `None` means nothing changed.
    async fn list_and_fetch(
        &self,
        cache: &ChangeCache,
    ) -> Result<Option<Vec<EncryptedBundle>>, SyncError> {
        let stage = async {
            let listing = self.store.list().await?;
            let changed = cache.diff(&listing);
            if changed.is_empty() {
                return Ok(None);
            }
            tracing::debug!(
                listed = listing.len(),
                changed = changed.len(),
                "change detection complete",
            );
            let bundles =
                fetch::fetch_changed(&self.store, &changed, cache.pending_writer()).await?;
            Ok(Some(bundles))
        };

        timeout(self.list_fetch_deadline, stage)
            .await
            .map_err(|_| SyncError::Deadline {
                stage: "listing+fetch",
            })?
    }

    fn plan(&self, archives: &[ExtractedArchive]) -> Vec<PlannedPush> {
        archives
            .iter()
            .map(|archive| PlannedPush {
                destination: format!(
                    "{}/{}.git",
                    self.destination_base,
                    archive.route.project_path()
                ),
                branch: archive.route.branch.clone(),
                short_sha: archive.route.short_sha.clone(),
            })
            .collect()
    }
}
