/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{
    FtpCommandError, FtpLineDataReadError, FtpRawResponseError, FtpTransferServerError,
    FtpTransferSetupError,
};

#[derive(Debug, Error)]
pub enum FtpFileStatError {
    #[error("raw command error: {0}")]
    RawCommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("file unavailable")]
    FileUnavailable,
}

impl From<FtpCommandError> for FtpFileStatError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpFileStatError::ServiceNotAvailable,
            _ => FtpFileStatError::RawCommandError(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileRetrieveStartError {
    #[error("data transfer setup error: {0}")]
    TransferSetupFailed(FtpTransferSetupError),
    #[error("command error: {0}")]
    CommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("file unavailable")]
    FileUnavailable,
}

impl From<FtpCommandError> for FtpFileRetrieveStartError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpFileRetrieveStartError::ServiceNotAvailable,
            _ => FtpFileRetrieveStartError::CommandError(e),
        }
    }
}

impl From<FtpTransferSetupError> for FtpFileRetrieveStartError {
    fn from(e: FtpTransferSetupError) -> Self {
        match e {
            FtpTransferSetupError::ServiceNotAvailable => {
                FtpFileRetrieveStartError::ServiceNotAvailable
            }
            _ => FtpFileRetrieveStartError::TransferSetupFailed(e),
        }
    }
}

impl FtpFileRetrieveStartError {
    fn is_channel_broken(&self) -> bool {
        match self {
            FtpFileRetrieveStartError::ServiceNotAvailable => true,
            FtpFileRetrieveStartError::CommandError(e) => e.is_channel_broken(),
            FtpFileRetrieveStartError::TransferSetupFailed(FtpTransferSetupError::CommandError(
                e,
            )) => e.is_channel_broken(),
            _ => false,
        }
    }

    fn is_timeout(&self) -> bool {
        match self {
            FtpFileRetrieveStartError::CommandError(e) => e.is_timeout(),
            FtpFileRetrieveStartError::TransferSetupFailed(e) => match e {
                FtpTransferSetupError::ConnectTimedOut => true,
                FtpTransferSetupError::CommandError(e) => e.is_timeout(),
                _ => false,
            },
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileListError {
    #[error("start failed: {0}")]
    StartFailed(#[from] FtpFileRetrieveStartError),
    #[error("server reported error: {0}")]
    ServerReportedError(#[from] FtpTransferServerError),
    #[error("timeout to wait end reply")]
    TimeoutToWaitEndReply,
    #[error("timeout to wait all data")]
    TimeoutToWaitAllData,
    #[error("data read failed: {0}")]
    DataReadFailed(FtpLineDataReadError),
    #[error("local io callback failed")]
    LocalIoCallbackFailed,
}

impl From<FtpLineDataReadError> for FtpFileListError {
    fn from(e: FtpLineDataReadError) -> Self {
        if matches!(e, FtpLineDataReadError::AbortedByCallback) {
            FtpFileListError::LocalIoCallbackFailed
        } else {
            FtpFileListError::DataReadFailed(e)
        }
    }
}

impl FtpFileListError {
    /// The path does not exist or access to it is denied
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            FtpFileListError::StartFailed(FtpFileRetrieveStartError::FileUnavailable)
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FtpFileListError::StartFailed(e) => e.is_timeout(),
            FtpFileListError::ServerReportedError(FtpTransferServerError::RecvFailed(e)) => {
                e.is_timeout()
            }
            FtpFileListError::TimeoutToWaitEndReply | FtpFileListError::TimeoutToWaitAllData => {
                true
            }
            _ => false,
        }
    }

    /// The control channel is left in an unknown state after this error
    pub fn is_channel_broken(&self) -> bool {
        match self {
            FtpFileListError::StartFailed(e) => e.is_channel_broken(),
            FtpFileListError::ServerReportedError(FtpTransferServerError::RecvFailed(_)) => true,
            FtpFileListError::TimeoutToWaitEndReply => true,
            FtpFileListError::ServerReportedError(_)
            | FtpFileListError::TimeoutToWaitAllData
            | FtpFileListError::DataReadFailed(_)
            | FtpFileListError::LocalIoCallbackFailed => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileRetrieveError {
    #[error("start failed: {0}")]
    StartFailed(#[from] FtpFileRetrieveStartError),
    #[error("data read failed: {0:?}")]
    DataReadFailed(io::Error),
    #[error("data connection idle timed out")]
    DataIdleTimeout,
    #[error("local write failed: {0:?}")]
    LocalWriteFailed(io::Error),
    #[error("server reported error: {0}")]
    ServerReportedError(FtpTransferServerError),
    #[error("timeout to wait end reply")]
    TimeoutToWaitEndReply,
    #[error("control read error: {0}")]
    ControlReadError(#[from] FtpRawResponseError),
}

impl From<FtpTransferServerError> for FtpFileRetrieveError {
    fn from(e: FtpTransferServerError) -> Self {
        if let FtpTransferServerError::RecvFailed(e) = e {
            FtpFileRetrieveError::ControlReadError(e)
        } else {
            FtpFileRetrieveError::ServerReportedError(e)
        }
    }
}

impl FtpFileRetrieveError {
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            FtpFileRetrieveError::StartFailed(FtpFileRetrieveStartError::FileUnavailable)
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FtpFileRetrieveError::StartFailed(e) => e.is_timeout(),
            FtpFileRetrieveError::DataIdleTimeout | FtpFileRetrieveError::TimeoutToWaitEndReply => {
                true
            }
            FtpFileRetrieveError::ControlReadError(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Data side failures are followed by a drain of the end reply, so only
    /// control side failures leave the channel in an unknown state
    pub fn is_channel_broken(&self) -> bool {
        match self {
            FtpFileRetrieveError::StartFailed(e) => e.is_channel_broken(),
            FtpFileRetrieveError::TimeoutToWaitEndReply
            | FtpFileRetrieveError::ControlReadError(_) => true,
            FtpFileRetrieveError::DataReadFailed(_)
            | FtpFileRetrieveError::DataIdleTimeout
            | FtpFileRetrieveError::LocalWriteFailed(_)
            | FtpFileRetrieveError::ServerReportedError(_) => false,
        }
    }
}
