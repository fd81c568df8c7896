/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use clap::{Arg, ArgAction, ArgMatches, Command};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use ftpwalk_core::{ClassifiedEntry, EntryKind, Session};
use ftpwalk_proto::FtpConnectionProvider;

pub(super) const COMMAND: &str = "list";

const COMMAND_ARG_PATH: &str = "path";
const COMMAND_ARG_FILES: &str = "files";
const COMMAND_ARG_DIRS: &str = "dirs";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("List path, with each entry classified as file or directory")
        .arg(
            Arg::new(COMMAND_ARG_PATH)
                .value_name("DIR PATH")
                .num_args(1),
        )
        .arg(
            Arg::new(COMMAND_ARG_FILES)
                .help("Only show files")
                .action(ArgAction::SetTrue)
                .long("files")
                .conflicts_with(COMMAND_ARG_DIRS),
        )
        .arg(
            Arg::new(COMMAND_ARG_DIRS)
                .help("Only show directories")
                .action(ArgAction::SetTrue)
                .long("dirs"),
        )
}

fn format_entry(e: &ClassifiedEntry) -> String {
    let entry = e.entry();
    let modified = entry
        .modified()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<4} {:>12} {:<16} {}\n",
        e.kind().as_str(),
        entry.size(),
        modified,
        entry.name()
    )
}

pub(super) async fn run<CP, S>(session: &mut Session<CP, S>, args: &ArgMatches) -> anyhow::Result<()>
where
    CP: FtpConnectionProvider<S> + Send,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let path = args
        .get_one::<String>(COMMAND_ARG_PATH)
        .map(|s| s.as_str())
        .unwrap_or_default();
    let only = if args.get_flag(COMMAND_ARG_FILES) {
        Some(EntryKind::File)
    } else if args.get_flag(COMMAND_ARG_DIRS) {
        Some(EntryKind::Directory)
    } else {
        None
    };

    let listing = session.list_classified(path).await?;
    let mut stdout = tokio::io::stdout();
    for e in listing.entries() {
        if only.is_some_and(|kind| kind != e.kind()) {
            continue;
        }
        stdout.write_all(format_entry(e).as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpwalk_core::Entry;

    #[test]
    fn entry_line() {
        let entry = Entry::new("pub", 4096, None).unwrap();
        let line = format_entry(&ClassifiedEntry::new(entry, EntryKind::Directory));
        assert!(line.ends_with(" pub\n"));
        assert!(line.contains(" 4096 "));
        assert!(line.contains(" - "));
    }
}
