/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modification time as reported in a listing, some servers only report the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl fmt::Display for ListTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ListTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryNameError {
    #[error("empty name")]
    Empty,
    #[error("path separator in name")]
    PathSeparator,
    #[error("'.' and '..' are not entries")]
    DotEntry,
}

/// One object of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    size: u64,
    modified: Option<ListTime>,
    type_hint: Option<EntryKind>,
}

impl Entry {
    pub fn new(name: &str, size: u64, modified: Option<ListTime>) -> Result<Self, EntryNameError> {
        if name.is_empty() {
            return Err(EntryNameError::Empty);
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(EntryNameError::PathSeparator);
        }
        if name == "." || name == ".." {
            return Err(EntryNameError::DotEntry);
        }
        Ok(Entry {
            name: name.to_string(),
            size,
            modified,
            type_hint: None,
        })
    }

    /// Record the type column of the listing line.
    pub fn with_type_hint(mut self, kind: EntryKind) -> Self {
        self.type_hint = Some(kind);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn modified(&self) -> Option<&ListTime> {
        self.modified.as_ref()
    }

    #[inline]
    pub fn type_hint(&self) -> Option<EntryKind> {
        self.type_hint
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEntry {
    entry: Entry,
    kind: EntryKind,
}

impl ClassifiedEntry {
    pub fn new(entry: Entry, kind: EntryKind) -> Self {
        ClassifiedEntry { entry, kind }
    }

    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Classified result of one directory listing.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    entries: Vec<ClassifiedEntry>,
}

impl Listing {
    pub fn new(entries: Vec<ClassifiedEntry>) -> Self {
        Listing { entries }
    }

    #[inline]
    pub fn entries(&self) -> &[ClassifiedEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir())
            .map(|e| e.entry())
    }

    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| e.entry())
    }

    /// Split into (files, directories).
    pub fn into_parts(self) -> (Vec<Entry>, Vec<Entry>) {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for e in self.entries {
            match e.kind {
                EntryKind::File => files.push(e.entry),
                EntryKind::Directory => dirs.push(e.entry),
            }
        }
        (files, dirs)
    }
}
