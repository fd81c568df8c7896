/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::FtpControlChannel;

/// Command verb, with the parameter for the fixed TYPE commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtpCommand(&'static str);

impl FtpCommand {
    /// not sent, only tags the greeting reply in errors
    pub const GREETING: FtpCommand = FtpCommand("-");
    pub const USER: FtpCommand = FtpCommand("USER");
    pub const PASS: FtpCommand = FtpCommand("PASS");
    pub const QUIT: FtpCommand = FtpCommand("QUIT");
    pub const TYPE_A: FtpCommand = FtpCommand("TYPE A");
    pub const TYPE_I: FtpCommand = FtpCommand("TYPE I");
    pub const PASV: FtpCommand = FtpCommand("PASV");
    pub const EPSV: FtpCommand = FtpCommand("EPSV");
    pub const CWD: FtpCommand = FtpCommand("CWD");
    pub const PWD: FtpCommand = FtpCommand("PWD");
    pub const SIZE: FtpCommand = FtpCommand("SIZE");
    pub const LIST: FtpCommand = FtpCommand("LIST");
    pub const RETR: FtpCommand = FtpCommand("RETR");
}

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) async fn send_cmd(&mut self, cmd: FtpCommand) -> io::Result<()> {
        self.send_cmd1(cmd, "").await
    }

    /// An empty `param` sends the bare verb. Line breaks are not allowed in `param`.
    pub(super) async fn send_cmd1(&mut self, cmd: FtpCommand, param: &str) -> io::Result<()> {
        if memchr::memchr2(b'\r', b'\n', param.as_bytes()).is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line break is not allowed in command parameter",
            ));
        }

        let mut line = String::with_capacity(cmd.0.len() + param.len() + 3);
        line.push_str(cmd.0);
        if !param.is_empty() {
            line.push(' ');
            line.push_str(param);
        }
        #[cfg(feature = "log-raw-io")]
        crate::debug::log_cmd(&line);
        line.push_str("\r\n");

        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await
    }
}
