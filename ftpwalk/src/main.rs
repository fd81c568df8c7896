/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use clap_complete::Shell;
use tokio::net::TcpStream;

use ftpwalk_core::{ClassifyPolicy, ListingClassifier, Session};
use ftpwalk_proto::FtpServerAddr;

mod config;
mod connection;
mod logger;

mod cmd_get;
mod cmd_list;

use config::AppConfig;

const GLOBAL_ARG_COMPLETION: &str = "completion";
const GLOBAL_ARG_SERVER: &str = "server";
const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_SOURCE_IP: &str = "source-ip";
const GLOBAL_ARG_VERBOSE: &str = "verbose";
const GLOBAL_ARG_CONFIG: &str = "config";
const GLOBAL_ARG_TIMEOUT: &str = "timeout";
const GLOBAL_ARG_POLICY: &str = "policy";
const GLOBAL_ARG_STRICT: &str = "strict";
const GLOBAL_ARG_TRUST_LISTING: &str = "trust-listing";

const ANONYMOUS_USERNAME: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

fn build_cli_args() -> Command {
    Command::new("ftpwalk")
        .arg(
            Arg::new(GLOBAL_ARG_COMPLETION)
                .num_args(1)
                .value_name("SHELL")
                .long("completion")
                .value_parser(value_parser!(Shell))
                .exclusive(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SERVER)
                .help("FTP server address")
                .num_args(1)
                .value_name("SERVER ADDRESS")
                .required_unless_present(GLOBAL_ARG_COMPLETION),
        )
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("FTP username, anonymous if not set")
                .num_args(1)
                .value_name("USERNAME")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("FTP password")
                .num_args(1)
                .value_name("PASSWORD")
                .short('p')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SOURCE_IP)
                .help("source ip address")
                .num_args(1)
                .value_name("IP ADDRESS")
                .value_parser(value_parser!(IpAddr))
                .long("source")
                .short('s')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_CONFIG)
                .help("YAML config file")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_parser(value_parser!(PathBuf))
                .long("config")
                .short('c')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_TIMEOUT)
                .help("Timeout for connect and every command, in seconds")
                .num_args(1)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .long("timeout")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_POLICY)
                .help("How to classify entries, 'heuristic' or 'strict'")
                .num_args(1)
                .value_name("POLICY")
                .long("policy")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_STRICT)
                .help("Probe every guessed entry with SIZE, same as '--policy strict'")
                .action(ArgAction::SetTrue)
                .long("strict")
                .conflicts_with(GLOBAL_ARG_POLICY)
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_TRUST_LISTING)
                .help("Trust the type column of listing lines")
                .action(ArgAction::SetTrue)
                .long("trust-listing")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .global(true),
        )
        .subcommand(cmd_list::command())
        .subcommand(cmd_get::command())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    if let Some(target) = args.get_one::<Shell>(GLOBAL_ARG_COMPLETION) {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    logger::SyncLogger::new(verbose_level)
        .into_global_logger()
        .map_err(|e| anyhow!("failed to set logger: {e}"))?;

    let mut config = match args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(secs) = args.get_one::<u64>(GLOBAL_ARG_TIMEOUT) {
        config.set_timeout(Duration::from_secs(*secs));
    }
    if let Some(policy) = args.get_one::<String>(GLOBAL_ARG_POLICY) {
        config.policy = config::parse_policy(policy)?;
    }
    if args.get_flag(GLOBAL_ARG_STRICT) {
        config.policy = ClassifyPolicy::Strict;
    }
    if args.get_flag(GLOBAL_ARG_TRUST_LISTING) {
        config.trust_listing = true;
    }

    let server = args
        .get_one::<String>(GLOBAL_ARG_SERVER)
        .ok_or_else(|| anyhow!("no server address set"))?;
    let server = FtpServerAddr::from_str(server)?;

    let username = args
        .get_one::<String>(GLOBAL_ARG_USERNAME)
        .cloned()
        .unwrap_or_else(|| ANONYMOUS_USERNAME.to_string());
    let password = args
        .get_one::<String>(GLOBAL_ARG_PASSWORD)
        .cloned()
        .unwrap_or_else(|| ANONYMOUS_PASSWORD.to_string());

    let mut conn_provider = connection::LocalConnectionProvider::default();
    if let Some(ip) = args.get_one::<IpAddr>(GLOBAL_ARG_SOURCE_IP) {
        conn_provider.set_bind_ip(*ip);
    }

    let Some((subcommand, sub_args)) = args.subcommand() else {
        return Err(anyhow!("no subcommand found"));
    };
    let subcommand = subcommand.to_string();
    let sub_args = sub_args.clone();

    let mut session = Session::new(conn_provider)
        .with_config(config.ftp)
        .with_policy(config.policy);
    if config.trust_listing {
        session = session.with_classifier(ListingClassifier);
    }

    session
        .scoped(move |s| {
            Box::pin(run_session(
                s,
                server,
                Login { username, password },
                subcommand,
                sub_args,
                config,
            ))
        })
        .await
}

struct Login {
    username: String,
    password: String,
}

async fn run_session(
    session: &mut Session<connection::LocalConnectionProvider, TcpStream>,
    server: FtpServerAddr,
    login: Login,
    subcommand: String,
    args: ArgMatches,
    config: AppConfig,
) -> anyhow::Result<()> {
    session
        .connect(server.host(), server.port(), config.timeout)
        .await?;
    session.login(&login.username, &login.password).await?;

    match subcommand.as_str() {
        cmd_list::COMMAND => cmd_list::run(session, &args).await,
        cmd_get::COMMAND => cmd_get::run(session, &args, &config).await,
        cmd => Err(anyhow!("invalid subcommand {cmd}")),
    }
}
