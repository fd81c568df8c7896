/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

/// Failure to read one complete reply from the control connection.
#[derive(Debug, Error)]
pub enum FtpRawResponseError {
    #[error("failed to read reply: {0}")]
    ReadFailed(io::Error),
    #[error("control connection closed by server")]
    ConnectionClosed,
    #[error("reply line exceeds the length limit")]
    LineTooLong,
    #[error("malformed reply line")]
    MalformedLine,
    #[error("reply code {0} out of range")]
    CodeOutOfRange(u16),
    #[error("reply text is not utf-8")]
    NotUtf8,
    #[error("multi-line reply exceeds the line limit")]
    TooManyLines,
    #[error("no reply to {0} in time")]
    TimedOut(&'static str),
}

impl FtpRawResponseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FtpRawResponseError::TimedOut(_))
    }
}
