/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use crate::{Entry, EntryKind};

/// Result of a SIZE query against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeProbe {
    /// numeric size returned
    Sized(u64),
    /// the server has no size for this path
    NoSize,
    /// SIZE is not implemented by the server
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Certain(EntryKind),
    /// may be confirmed by a size probe when the strict policy is in use
    Guess(EntryKind),
}

impl Verdict {
    pub fn kind(&self) -> EntryKind {
        match self {
            Verdict::Certain(k) | Verdict::Guess(k) => *k,
        }
    }

    #[inline]
    pub fn is_guess(&self) -> bool {
        matches!(self, Verdict::Guess(_))
    }

    /// Resolve the verdict with a probe result.
    ///
    /// Certain verdicts are never overridden. A guess is kept if the server can not answer
    /// SIZE at all.
    pub fn confirm(self, probe: SizeProbe) -> EntryKind {
        match (self, probe) {
            (Verdict::Certain(k), _) => k,
            (Verdict::Guess(_), SizeProbe::Sized(_)) => EntryKind::File,
            (Verdict::Guess(_), SizeProbe::NoSize) => EntryKind::Directory,
            (Verdict::Guess(k), SizeProbe::Unsupported) => k,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifyPolicy {
    #[default]
    Heuristic,
    /// probe every guessed entry with SIZE, one round trip per entry
    Strict,
}

impl ClassifyPolicy {
    pub(crate) fn should_probe(&self, verdict: &Verdict) -> bool {
        matches!(self, ClassifyPolicy::Strict) && verdict.is_guess()
    }
}

/// Decide whether a listing entry is a file or a directory.
///
/// Implementations must be pure: the same entry always gets the same verdict.
pub trait EntryClassifier: Send + Sync {
    fn classify(&self, entry: &Entry) -> Verdict;
}

impl<F> EntryClassifier for F
where
    F: Fn(&Entry) -> Verdict + Send + Sync,
{
    fn classify(&self, entry: &Entry) -> Verdict {
        self(entry)
    }
}

/// Names without an extension are taken as directories.
///
/// A leading dot does not start an extension, so `.profile` is a directory
/// while `.profile.bak` is a file. Extensionless files and directories with
/// a dot in their name are misclassified.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionClassifier;

impl ExtensionClassifier {
    pub fn guess(name: &str) -> EntryKind {
        if name.trim_start_matches('.').contains('.') {
            EntryKind::File
        } else {
            EntryKind::Directory
        }
    }
}

impl EntryClassifier for ExtensionClassifier {
    fn classify(&self, entry: &Entry) -> Verdict {
        Verdict::Guess(Self::guess(entry.name()))
    }
}

/// Trust the type column of the listing when there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingClassifier;

impl EntryClassifier for ListingClassifier {
    fn classify(&self, entry: &Entry) -> Verdict {
        match entry.type_hint() {
            Some(kind) => Verdict::Certain(kind),
            None => Verdict::Guess(ExtensionClassifier::guess(entry.name())),
        }
    }
}
