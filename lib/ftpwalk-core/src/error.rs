/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use thiserror::Error;

use ftpwalk_proto::{
    FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileStatError, FtpSessionOpenError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
    #[error("connect failed: {0}")]
    ConnectFailed(FtpConnectError),
    #[error("connect timed out")]
    Timeout,
    #[error("connection provider lost by a cancelled operation")]
    ProviderLost,
}

impl From<FtpConnectError> for ConnectError {
    fn from(e: FtpConnectError) -> Self {
        if e.is_timeout() {
            ConnectError::Timeout
        } else {
            ConnectError::ConnectFailed(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login is not allowed in {0} state")]
    InvalidState(SessionState),
    #[error("login rejected: {0}")]
    Rejected(FtpSessionOpenError),
    #[error("login timed out")]
    Timeout,
}

impl From<FtpSessionOpenError> for AuthError {
    fn from(e: FtpSessionOpenError) -> Self {
        if e.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Rejected(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("not connected")]
    NotConnected,
    #[error("not allowed in {0} state")]
    InvalidState(SessionState),
    #[error("path {0} does not exist or access denied")]
    Unavailable(String),
    #[error("list failed: {0}")]
    Failed(FtpFileListError),
    #[error("command failed: {0}")]
    Command(FtpCommandError),
    #[error("list timed out")]
    Timeout,
}

impl ListError {
    pub(crate) fn not_ready(state: SessionState) -> Self {
        match state {
            SessionState::Disconnected => ListError::NotConnected,
            _ => ListError::InvalidState(state),
        }
    }

    pub(crate) fn from_list(path: &str, e: FtpFileListError) -> Self {
        if e.is_unavailable() {
            ListError::Unavailable(path.to_string())
        } else if e.is_timeout() {
            ListError::Timeout
        } else {
            ListError::Failed(e)
        }
    }

    pub(crate) fn from_stat(path: &str, e: FtpFileStatError) -> Self {
        match e {
            FtpFileStatError::FileUnavailable => ListError::Unavailable(path.to_string()),
            FtpFileStatError::ServiceNotAvailable => {
                ListError::Command(FtpCommandError::ServiceNotAvailable)
            }
            FtpFileStatError::RawCommandError(e) => e.into(),
        }
    }
}

impl From<FtpCommandError> for ListError {
    fn from(e: FtpCommandError) -> Self {
        if e.is_timeout() {
            ListError::Timeout
        } else {
            ListError::Command(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("not connected")]
    NotConnected,
    #[error("not allowed in {0} state")]
    InvalidState(SessionState),
    #[error("remote file {0} does not exist or access denied")]
    Unavailable(String),
    #[error("transfer failed: {0}")]
    Remote(FtpFileRetrieveError),
    #[error("local io failed: {0:?}")]
    LocalIo(#[from] io::Error),
    #[error("transfer timed out")]
    Timeout,
}

impl TransferError {
    pub(crate) fn not_ready(state: SessionState) -> Self {
        match state {
            SessionState::Disconnected => TransferError::NotConnected,
            _ => TransferError::InvalidState(state),
        }
    }

    pub(crate) fn from_retrieve(path: &str, e: FtpFileRetrieveError) -> Self {
        match e {
            FtpFileRetrieveError::LocalWriteFailed(e) => TransferError::LocalIo(e),
            e if e.is_unavailable() => TransferError::Unavailable(path.to_string()),
            e if e.is_timeout() => TransferError::Timeout,
            e => TransferError::Remote(e),
        }
    }
}
