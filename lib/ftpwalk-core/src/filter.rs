/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use crate::Entry;

#[derive(Debug, Error)]
#[error("filter failed: {0}")]
pub struct FilterError(String);

impl FilterError {
    pub fn new<T: Into<String>>(reason: T) -> Self {
        FilterError(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Select the files to download. Only called for entries classified as file.
pub trait EntryFilter: Send + Sync {
    fn keep(&self, entry: &Entry) -> Result<bool, FilterError>;
}

impl<F> EntryFilter for F
where
    F: Fn(&Entry) -> Result<bool, FilterError> + Send + Sync,
{
    fn keep(&self, entry: &Entry) -> Result<bool, FilterError> {
        self(entry)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl EntryFilter for KeepAll {
    fn keep(&self, _entry: &Entry) -> Result<bool, FilterError> {
        Ok(true)
    }
}

/// Keep names that end with any of the suffixes.
#[derive(Debug, Clone)]
pub struct SuffixFilter {
    suffixes: Vec<String>,
}

impl SuffixFilter {
    pub fn new<I, T>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        SuffixFilter {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl EntryFilter for SuffixFilter {
    fn keep(&self, entry: &Entry) -> Result<bool, FilterError> {
        Ok(self.suffixes.iter().any(|s| entry.name().ends_with(s)))
    }
}
