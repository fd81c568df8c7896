/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::FtpCommandError;

#[derive(Debug, Error)]
pub enum FtpConnectError {
    #[error("connect failed: {0:?}")]
    ConnectIoError(io::Error),
    #[error("connect timed out")]
    ConnectTimedOut,
    #[error("greeting timed out")]
    GreetingTimedOut,
    #[error("greeting failed: {0}")]
    GreetingFailed(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
}

impl FtpConnectError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FtpConnectError::ConnectTimedOut | FtpConnectError::GreetingTimedOut
        )
    }
}

impl From<FtpCommandError> for FtpConnectError {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpConnectError::ServiceNotAvailable,
            _ => FtpConnectError::GreetingFailed(e),
        }
    }
}
