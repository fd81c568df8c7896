/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{FilterError, ListError, TransferError};

#[derive(Debug)]
pub enum WalkFailureKind {
    List(ListError),
    Download(TransferError),
    DepthExceeded(usize),
    Revisited,
}

impl fmt::Display for WalkFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkFailureKind::List(e) => write!(f, "list failed: {e}"),
            WalkFailureKind::Download(e) => write!(f, "download failed: {e}"),
            WalkFailureKind::DepthExceeded(max) => write!(f, "depth exceeds {max}"),
            WalkFailureKind::Revisited => f.write_str("directory already visited"),
        }
    }
}

#[derive(Debug)]
pub struct WalkFailure {
    pub path: String,
    pub kind: WalkFailureKind,
}

impl fmt::Display for WalkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub remote: String,
    pub local: PathBuf,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct WalkReport {
    pub downloaded: Vec<DownloadedFile>,
    /// rejected by the filter
    pub filtered: usize,
    /// accepted by the filter but found in the download history
    pub already_downloaded: usize,
    pub listed_dirs: usize,
    pub failures: Vec<WalkFailure>,
}

impl WalkReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded.iter().map(|f| f.size).sum()
    }
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("unable to create local root {0}: {1:?}")]
    LocalRoot(PathBuf, io::Error),
    #[error("filter failed on {path}: {source}")]
    Filter {
        path: String,
        #[source]
        source: FilterError,
    },
    #[error("session lost at {failure}")]
    SessionLost {
        failure: WalkFailure,
        report: Box<WalkReport>,
    },
}
