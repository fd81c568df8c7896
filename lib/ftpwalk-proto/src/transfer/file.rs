/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::FtpTransferConfig;
use crate::error::FtpFileRetrieveError;

const COPY_BUFFER_SIZE: usize = 16 * 1024;

/// Copy of a single file data connection into a local writer.
pub(crate) struct FtpFileDataTransfer<T: AsyncRead> {
    io: T,
    idle_timeout: Duration,
}

impl<T> FtpFileDataTransfer<T>
where
    T: AsyncRead + Unpin,
{
    pub(crate) fn new(io: T, config: &FtpTransferConfig) -> Self {
        FtpFileDataTransfer {
            io,
            idle_timeout: config.data_idle_timeout,
        }
    }

    /// Returns the number of bytes copied.
    pub(crate) async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let nr = match tokio::time::timeout(self.idle_timeout, self.io.read(&mut buf)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(FtpFileRetrieveError::DataReadFailed(e)),
                Err(_) => return Err(FtpFileRetrieveError::DataIdleTimeout),
            };
            if nr == 0 {
                writer
                    .flush()
                    .await
                    .map_err(FtpFileRetrieveError::LocalWriteFailed)?;
                return Ok(total);
            }
            writer
                .write_all(&buf[..nr])
                .await
                .map_err(FtpFileRetrieveError::LocalWriteFailed)?;
            total += nr as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_binary() {
        let content: Vec<u8> = (0..=255u8).cycle().take(40000).collect();
        let stream = tokio_test::io::Builder::new()
            .read(&content[..20000])
            .read(&content[20000..])
            .build();
        let transfer = FtpFileDataTransfer::new(stream, &FtpTransferConfig::default());
        let mut out = Vec::new();
        let n = transfer.copy_to(&mut out).await.unwrap();
        assert_eq!(n, 40000);
        assert_eq!(out, content);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout() {
        let stream = tokio_test::io::Builder::new()
            .read(b"partial")
            .wait(Duration::from_secs(120))
            .build();
        let transfer = FtpFileDataTransfer::new(stream, &FtpTransferConfig::default());
        let mut out = Vec::new();
        let e = transfer.copy_to(&mut out).await.unwrap_err();
        assert!(matches!(e, FtpFileRetrieveError::DataIdleTimeout));
        assert_eq!(out.as_slice(), b"partial");
    }
}
