/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod addr;
mod client;
mod config;
mod connection;
mod control;
mod debug;
mod error;
mod io;
mod transfer;

pub use addr::{FTP_DEFAULT_PORT, FtpServerAddr, FtpServerAddrParseError};
pub use client::FtpClient;
pub use config::{FtpClientConfig, FtpControlConfig, FtpTransferConfig};
#[cfg(feature = "yaml")]
pub use config::yaml;
pub use connection::FtpConnectionProvider;
pub use control::FtpCommand;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};
pub use error::{
    FtpAuthStatus, FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileRetrieveStartError, FtpFileStatError, FtpLineDataReadError, FtpRawResponseError,
    FtpSessionOpenError, FtpTransferServerError, FtpTransferSetupError,
};
pub use transfer::{FtpLineDataReceiver, FtpTransferType};
