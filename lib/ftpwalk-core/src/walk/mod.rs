/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::history::{DownloadHistory, HistoryRecord};
use crate::path::join_remote;
use crate::{EntryFilter, KeepAll, ListError, Listing, TransferError};

mod report;
pub use report::{DownloadedFile, WalkError, WalkFailure, WalkFailureKind, WalkReport};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Where the walker gets listings and files from.
#[async_trait]
pub trait RemoteSource {
    /// `false` once the underlying connection is gone.
    fn is_usable(&self) -> bool;

    async fn list_dir(&mut self, path: &str) -> Result<Listing, ListError>;

    async fn fetch_file(&mut self, remote_path: &str, local_path: &Path)
    -> Result<u64, TransferError>;
}

struct PendingDir {
    remote: String,
    relative: PathBuf,
    depth: usize,
}

/// Depth first download of a remote tree, the local tree under `local_root`
/// mirrors the remote tree under the walk root.
pub struct Walker {
    local_root: PathBuf,
    filter: Arc<dyn EntryFilter>,
    max_depth: usize,
    history: Option<DownloadHistory>,
}

impl Walker {
    pub fn new<P: Into<PathBuf>>(local_root: P) -> Self {
        Walker {
            local_root: local_root.into(),
            filter: Arc::new(KeepAll),
            max_depth: DEFAULT_MAX_DEPTH,
            history: None,
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: EntryFilter + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    /// Directories deeper than `max_depth` below the walk root are not listed.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_history(mut self, history: DownloadHistory) -> Self {
        self.history = Some(history);
        self
    }

    #[inline]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    fn session_lost(failure: WalkFailure, report: WalkReport) -> WalkError {
        warn!("session lost, abort the walk at {}", failure.path);
        WalkError::SessionLost {
            failure,
            report: Box::new(report),
        }
    }

    fn record_failure(report: &mut WalkReport, path: String, kind: WalkFailureKind) {
        let failure = WalkFailure { path, kind };
        warn!("{failure}");
        report.failures.push(failure);
    }

    pub async fn walk<R>(
        &mut self,
        source: &mut R,
        remote_root: &str,
    ) -> Result<WalkReport, WalkError>
    where
        R: RemoteSource + Send,
    {
        tokio::fs::create_dir_all(&self.local_root)
            .await
            .map_err(|e| WalkError::LocalRoot(self.local_root.clone(), e))?;

        let mut report = WalkReport::default();
        let mut visited = HashSet::new();
        let mut pending = vec![PendingDir {
            remote: remote_root.to_string(),
            relative: PathBuf::new(),
            depth: 0,
        }];

        while let Some(dir) = pending.pop() {
            if dir.depth > self.max_depth {
                Self::record_failure(
                    &mut report,
                    dir.remote,
                    WalkFailureKind::DepthExceeded(self.max_depth),
                );
                continue;
            }
            if !visited.insert(dir.remote.clone()) {
                Self::record_failure(&mut report, dir.remote, WalkFailureKind::Revisited);
                continue;
            }

            debug!("listing {}", dir.remote);
            let listing = match source.list_dir(&dir.remote).await {
                Ok(listing) => listing,
                Err(e) => {
                    let failure = WalkFailure {
                        path: dir.remote,
                        kind: WalkFailureKind::List(e),
                    };
                    if !source.is_usable() {
                        return Err(Self::session_lost(failure, report));
                    }
                    warn!("{failure}");
                    report.failures.push(failure);
                    continue;
                }
            };
            report.listed_dirs += 1;

            let (files, dirs) = listing.into_parts();
            for file in files {
                let remote = join_remote(&dir.remote, file.name());
                match self.filter.keep(&file) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("{remote} filtered out");
                        report.filtered += 1;
                        continue;
                    }
                    Err(e) => {
                        return Err(WalkError::Filter {
                            path: remote,
                            source: e,
                        });
                    }
                }

                let record = HistoryRecord::new(&remote, &file);
                if let Some(history) = &mut self.history {
                    if history.contains(&record).await {
                        debug!("{remote} found in download history");
                        report.already_downloaded += 1;
                        continue;
                    }
                }

                let local = self.local_root.join(&dir.relative).join(file.name());
                match source.fetch_file(&remote, &local).await {
                    Ok(size) => {
                        if let Some(history) = &mut self.history {
                            if let Err(e) = history.record(record).await {
                                warn!(
                                    "unable to update history file {}: {e}",
                                    history.path().display()
                                );
                            }
                        }
                        report.downloaded.push(DownloadedFile {
                            remote,
                            local,
                            size,
                        });
                    }
                    Err(e) => {
                        let failure = WalkFailure {
                            path: remote,
                            kind: WalkFailureKind::Download(e),
                        };
                        if !source.is_usable() {
                            return Err(Self::session_lost(failure, report));
                        }
                        warn!("{failure}");
                        report.failures.push(failure);
                    }
                }
            }

            // reversed so that the first listed directory is walked first
            for sub in dirs.iter().rev() {
                pending.push(PendingDir {
                    remote: join_remote(&dir.remote, sub.name()),
                    relative: dir.relative.join(sub.name()),
                    depth: dir.depth + 1,
                });
            }
        }

        Ok(report)
    }
}
