/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::Entry;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// remote path
    pub name: String,
    pub size: u64,
    pub modified_date: Option<String>,
}

impl HistoryRecord {
    pub fn new(remote_path: &str, entry: &Entry) -> Self {
        HistoryRecord {
            name: remote_path.to_string(),
            size: entry.size(),
            modified_date: entry.modified().map(|t| t.to_string()),
        }
    }
}

/// Files downloaded by previous runs, persisted as a JSON array.
pub struct DownloadHistory {
    path: PathBuf,
    loaded: bool,
    records: Vec<HistoryRecord>,
    index: HashSet<HistoryRecord>,
}

impl DownloadHistory {
    /// Nothing is read until the first lookup.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DownloadHistory {
            path: path.into(),
            loaded: false,
            records: Vec::new(),
            index: HashSet::new(),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let content = match tokio::fs::read(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!("unable to read history file {}: {e}", self.path.display());
                return;
            }
        };
        match serde_json::from_slice::<Vec<HistoryRecord>>(&content) {
            Ok(records) => {
                debug!(
                    "loaded {} history records from {}",
                    records.len(),
                    self.path.display()
                );
                self.index = records.iter().cloned().collect();
                self.records = records;
            }
            Err(e) => warn!("ignore malformed history file {}: {e}", self.path.display()),
        }
    }

    pub async fn contains(&mut self, record: &HistoryRecord) -> bool {
        self.load().await;
        self.index.contains(record)
    }

    /// Append a record and rewrite the history file.
    pub async fn record(&mut self, record: HistoryRecord) -> io::Result<()> {
        self.load().await;
        if !self.index.insert(record.clone()) {
            return Ok(());
        }
        self.records.push(record);

        let content = serde_json::to_vec_pretty(&self.records).map_err(io::Error::other)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, content).await
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::ListTime;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ftpwalk-history-{}", fastrand::u64(..)))
            .join(name)
    }

    fn entry(name: &str, size: u64) -> Entry {
        let d = NaiveDate::from_ymd_opt(2018, 3, 1).unwrap();
        Entry::new(name, size, Some(ListTime::Date(d))).unwrap()
    }

    #[tokio::test]
    async fn record_and_reload() {
        let path = temp_file("history.json");
        let mut history = DownloadHistory::new(&path);
        let r = HistoryRecord::new("/pub/a.txt", &entry("a.txt", 10));
        assert!(!history.contains(&r).await);
        history.record(r.clone()).await.unwrap();
        history.record(r.clone()).await.unwrap();
        assert_eq!(history.len(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {"));
        assert!(content.contains("\"modified_date\": \"2018-03-01\""));

        let mut reloaded = DownloadHistory::new(&path);
        assert!(reloaded.contains(&r).await);
        // a changed size is a new file
        let r2 = HistoryRecord::new("/pub/a.txt", &entry("a.txt", 11));
        assert!(!reloaded.contains(&r2).await);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn malformed_is_ignored() {
        let path = temp_file("history.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let mut history = DownloadHistory::new(&path);
        let r = HistoryRecord::new("b.txt", &entry("b.txt", 5));
        assert!(!history.contains(&r).await);
        assert!(history.is_empty());
        history.record(r.clone()).await.unwrap();

        let mut reloaded = DownloadHistory::new(&path);
        assert!(reloaded.contains(&r).await);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
