/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use super::FtpCommandError;

/// Login progress after a USER or PASS reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpAuthStatus {
    LoggedIn,
    NeedPassword,
    NeedAccount,
    Rejected,
}

#[derive(Debug, Error)]
pub enum FtpSessionOpenError {
    #[error("login command failed: {0}")]
    CommandFailed(#[from] FtpCommandError),
    #[error("credentials rejected")]
    Rejected,
    #[error("server requires an account")]
    AccountRequired,
}

impl FtpSessionOpenError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FtpSessionOpenError::CommandFailed(e) if e.is_timeout())
    }
}
