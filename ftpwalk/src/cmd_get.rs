/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::warn;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use ftpwalk_core::{
    DownloadHistory, Entry, EntryFilter, FilterError, Session, SuffixFilter, WalkError, WalkReport,
    Walker,
};
use ftpwalk_proto::FtpConnectionProvider;

use crate::config::AppConfig;

pub(super) const COMMAND: &str = "get";

const COMMAND_ARG_PATH: &str = "path";
const COMMAND_ARG_LOCAL_DIR: &str = "local-dir";
const COMMAND_ARG_SUFFIX: &str = "suffix";
const COMMAND_ARG_MATCH: &str = "match";
const COMMAND_ARG_HISTORY: &str = "history";
const COMMAND_ARG_MAX_DEPTH: &str = "max-depth";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Download path recursively")
        .arg(
            Arg::new(COMMAND_ARG_PATH)
                .value_name("DIR PATH")
                .num_args(1),
        )
        .arg(
            Arg::new(COMMAND_ARG_LOCAL_DIR)
                .help("Local directory to mirror into")
                .value_name("LOCAL DIR")
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .short('d')
                .long("local-dir"),
        )
        .arg(
            Arg::new(COMMAND_ARG_SUFFIX)
                .help("Only download files with this name suffix")
                .value_name("SUFFIX")
                .num_args(1)
                .action(ArgAction::Append)
                .long("suffix"),
        )
        .arg(
            Arg::new(COMMAND_ARG_MATCH)
                .help("Only download files whose name matches this regex")
                .value_name("REGEX")
                .value_parser(value_parser!(Regex))
                .num_args(1)
                .long("match"),
        )
        .arg(
            Arg::new(COMMAND_ARG_HISTORY)
                .help("Download history file, already recorded files are skipped")
                .value_name("HISTORY FILE")
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .long("history"),
        )
        .arg(
            Arg::new(COMMAND_ARG_MAX_DEPTH)
                .help("Max directory depth below the start path")
                .value_name("DEPTH")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .long("max-depth"),
        )
}

struct NameFilter {
    suffix: Option<SuffixFilter>,
    pattern: Option<Regex>,
}

impl EntryFilter for NameFilter {
    fn keep(&self, entry: &Entry) -> Result<bool, FilterError> {
        if let Some(suffix) = &self.suffix
            && !suffix.keep(entry)?
        {
            return Ok(false);
        }
        Ok(self
            .pattern
            .as_ref()
            .is_none_or(|re| re.is_match(entry.name())))
    }
}

fn summary(report: &WalkReport) -> String {
    format!(
        "downloaded {} files ({} bytes), {} filtered, {} already downloaded, {} dirs listed, {} failures\n",
        report.downloaded.len(),
        report.downloaded_bytes(),
        report.filtered,
        report.already_downloaded,
        report.listed_dirs,
        report.failures.len(),
    )
}

async fn print_report(report: &WalkReport) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    for f in &report.downloaded {
        let line = format!("{} -> {}\n", f.remote, f.local.display());
        stdout.write_all(line.as_bytes()).await?;
    }
    for f in &report.failures {
        warn!("{f}");
    }
    stdout.write_all(summary(report).as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

pub(super) async fn run<CP, S>(
    session: &mut Session<CP, S>,
    args: &ArgMatches,
    config: &AppConfig,
) -> anyhow::Result<()>
where
    CP: FtpConnectionProvider<S> + Send,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let path = args
        .get_one::<String>(COMMAND_ARG_PATH)
        .map(|s| s.as_str())
        .unwrap_or_default();
    let local_dir = args
        .get_one::<PathBuf>(COMMAND_ARG_LOCAL_DIR)
        .unwrap_or(&config.download_dir);
    let max_depth = args
        .get_one::<usize>(COMMAND_ARG_MAX_DEPTH)
        .copied()
        .unwrap_or(config.max_depth);

    let suffix = args
        .get_many::<String>(COMMAND_ARG_SUFFIX)
        .map(|v| SuffixFilter::new(v.cloned()));
    let pattern = args.get_one::<Regex>(COMMAND_ARG_MATCH).cloned();

    let mut walker = Walker::new(local_dir.clone())
        .with_filter(NameFilter { suffix, pattern })
        .with_max_depth(max_depth);
    if let Some(history) = args
        .get_one::<PathBuf>(COMMAND_ARG_HISTORY)
        .or(config.history.as_ref())
    {
        walker = walker.with_history(DownloadHistory::new(history.clone()));
    }

    match walker.walk(session, path).await {
        Ok(report) => {
            print_report(&report).await?;
            if report.is_complete() {
                Ok(())
            } else {
                Err(anyhow!("{} failures during the walk", report.failures.len()))
            }
        }
        Err(WalkError::SessionLost { failure, report }) => {
            print_report(&report).await?;
            Err(anyhow!("session lost at {failure}"))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> Entry {
        Entry::new(name, 1, None).unwrap()
    }

    #[test]
    fn name_filter() {
        let filter = NameFilter {
            suffix: Some(SuffixFilter::new([".gz", ".zip"])),
            pattern: Some(Regex::new("^log-").unwrap()),
        };
        assert!(filter.keep(&file("log-1.gz")).unwrap());
        assert!(!filter.keep(&file("data-1.gz")).unwrap());
        assert!(!filter.keep(&file("log-1.txt")).unwrap());

        let filter = NameFilter {
            suffix: None,
            pattern: None,
        };
        assert!(filter.keep(&file("anything")).unwrap());
    }

    #[test]
    fn summary_line() {
        let report = WalkReport::default();
        assert_eq!(
            summary(&report),
            "downloaded 0 files (0 bytes), 0 filtered, 0 already downloaded, 0 dirs listed, 0 failures\n"
        );
    }
}
