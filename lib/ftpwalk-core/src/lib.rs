/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod classify;
mod entry;
mod error;
mod filter;
mod history;
mod listing;
mod path;
mod session;
mod walk;

pub use classify::{
    ClassifyPolicy, EntryClassifier, ExtensionClassifier, ListingClassifier, SizeProbe, Verdict,
};
pub use entry::{ClassifiedEntry, Entry, EntryKind, EntryNameError, ListTime, Listing};
pub use error::{AuthError, ConnectError, ListError, SessionState, TransferError};
pub use filter::{EntryFilter, FilterError, KeepAll, SuffixFilter};
pub use history::{DownloadHistory, HistoryRecord};
pub use listing::parse_list_line;
pub use path::join_remote;
pub use session::Session;
pub use walk::{
    DEFAULT_MAX_DEPTH, DownloadedFile, RemoteSource, WalkError, WalkFailure, WalkFailureKind,
    WalkReport, Walker,
};
