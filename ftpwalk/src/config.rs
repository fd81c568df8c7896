/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader, yaml};

use ftpwalk_core::{ClassifyPolicy, DEFAULT_MAX_DEPTH};
use ftpwalk_proto::FtpClientConfig;
use ftpwalk_proto::yaml::{as_bool, as_duration, as_usize, foreach_kv, normalize_key};

const DEFAULT_DOWNLOAD_DIR: &str = "downloaded_ftp";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub(crate) struct AppConfig {
    pub(crate) ftp: FtpClientConfig,
    pub(crate) timeout: Duration,
    pub(crate) download_dir: PathBuf,
    pub(crate) policy: ClassifyPolicy,
    pub(crate) trust_listing: bool,
    pub(crate) max_depth: usize,
    pub(crate) history: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            ftp: FtpClientConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            policy: ClassifyPolicy::default(),
            trust_listing: false,
            max_depth: DEFAULT_MAX_DEPTH,
            history: None,
        }
    }
}

impl AppConfig {
    /// Command line timeout, also used as the RETR data idle timeout.
    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
        self.ftp.transfer_mut().set_data_idle_timeout(timeout);
    }

    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
        AppConfig::parse(&content).context(format!("invalid config file {}", path.display()))
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        let docs = YamlLoader::load_from_str(content).map_err(|e| anyhow!("invalid yaml: {e}"))?;
        let mut config = AppConfig::default();
        for doc in &docs {
            match doc {
                Yaml::Hash(map) => config.parse_main(map)?,
                Yaml::Null => {}
                _ => return Err(anyhow!("root type should be hash")),
            }
        }
        Ok(config)
    }

    fn parse_main(&mut self, map: &yaml::Hash) -> anyhow::Result<()> {
        foreach_kv(map, |k, v| match normalize_key(k).as_str() {
            "ftp" | "ftp_client" => {
                self.ftp = FtpClientConfig::parse_yaml(v)?;
                Ok(())
            }
            "timeout" => {
                self.timeout = as_duration(v)?;
                Ok(())
            }
            "download_dir" | "download_directory" => {
                self.download_dir = as_path(v)?;
                Ok(())
            }
            "policy" | "classify_policy" => {
                self.policy = as_policy(v)?;
                Ok(())
            }
            "trust_listing" => {
                self.trust_listing = as_bool(v)?;
                Ok(())
            }
            "max_depth" => {
                self.max_depth = as_usize(v)?;
                Ok(())
            }
            "history" | "history_file" => {
                self.history = Some(as_path(v)?);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k} in main conf")),
        })
    }
}

fn as_path(v: &Yaml) -> anyhow::Result<PathBuf> {
    match v {
        Yaml::String(s) if !s.is_empty() => Ok(PathBuf::from(s)),
        _ => Err(anyhow!("path value should be a non-empty string")),
    }
}

pub(crate) fn parse_policy(s: &str) -> anyhow::Result<ClassifyPolicy> {
    match s.to_lowercase().as_str() {
        "heuristic" | "guess" => Ok(ClassifyPolicy::Heuristic),
        "strict" | "probe" => Ok(ClassifyPolicy::Strict),
        _ => Err(anyhow!("unsupported classify policy {s}")),
    }
}

fn as_policy(v: &Yaml) -> anyhow::Result<ClassifyPolicy> {
    match v {
        Yaml::String(s) => parse_policy(s),
        _ => Err(anyhow!("classify policy should be a string")),
    }
}
