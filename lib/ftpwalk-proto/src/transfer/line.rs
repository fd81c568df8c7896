/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, BufReader};

use crate::config::FtpTransferConfig;
use crate::error::FtpLineDataReadError;
use crate::io::limited_read_until;

#[async_trait]
pub trait FtpLineDataReceiver {
    async fn recv_line(&mut self, line: &str);
    fn should_return_early(&self) -> bool;

    /// Called for a line that is not valid UTF-8 or exceeds the line length
    /// limit. The line is dropped and reading goes on with the next one.
    fn skip_invalid_line(&mut self, _line_no: usize) {}
}

pub(crate) struct FtpLineDataTransfer<T: AsyncRead> {
    io: BufReader<T>,
    max_lines: usize,
    max_line_len: usize,
    line_buf: Vec<u8>,
}

impl<T> FtpLineDataTransfer<T>
where
    T: AsyncRead + Unpin,
{
    pub(crate) fn new(io: T, config: &FtpTransferConfig) -> Self {
        FtpLineDataTransfer {
            io: BufReader::new(io),
            max_lines: config.list_max_entries,
            max_line_len: config.list_max_line_len,
            line_buf: Vec::with_capacity(config.list_max_line_len),
        }
    }

    async fn send_buf_to_receiver<R>(
        &mut self,
        receiver: &mut R,
        line_no: usize,
    ) -> Result<(), FtpLineDataReadError>
    where
        R: FtpLineDataReceiver + Send,
    {
        match std::str::from_utf8(&self.line_buf) {
            Ok(s) => receiver.recv_line(s).await,
            Err(_) => {
                debug!("skip non utf-8 list line {line_no}");
                receiver.skip_invalid_line(line_no);
            }
        }
        self.line_buf.clear();
        if receiver.should_return_early() {
            return Err(FtpLineDataReadError::AbortedByCallback);
        }
        Ok(())
    }

    /// Drop the rest of the current line, returns `true` if EOF was reached.
    async fn discard_line(&mut self) -> Result<bool, FtpLineDataReadError> {
        loop {
            self.line_buf.clear();
            let (found, nr) =
                limited_read_until(&mut self.io, b'\n', self.max_line_len, &mut self.line_buf)
                    .await?;
            if found {
                self.line_buf.clear();
                return Ok(false);
            }
            if nr < self.max_line_len {
                self.line_buf.clear();
                return Ok(true);
            }
        }
    }

    pub(crate) async fn read_to_end<R>(mut self, receiver: &mut R) -> Result<(), FtpLineDataReadError>
    where
        R: FtpLineDataReceiver + Send,
    {
        for i in 0..self.max_lines {
            let (found, nr) =
                limited_read_until(&mut self.io, b'\n', self.max_line_len, &mut self.line_buf)
                    .await?;
            if nr == 0 {
                return Ok(());
            }

            if !found && nr >= self.max_line_len {
                debug!("skip too long list line {}", i + 1);
                let eof = self.discard_line().await?;
                receiver.skip_invalid_line(i + 1);
                if eof {
                    return Ok(());
                }
                continue;
            }

            self.send_buf_to_receiver(receiver, i + 1).await?;
            if !found {
                // last line without line ending
                return Ok(());
            }
        }

        // the limit is only exceeded if there is still data left
        let (_, nr) = limited_read_until(&mut self.io, b'\n', 1, &mut self.line_buf).await?;
        if nr == 0 {
            Ok(())
        } else {
            Err(FtpLineDataReadError::TooManyLines)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct VecReceiver {
        lines: Vec<String>,
        invalid: Vec<usize>,
        limit: Option<usize>,
    }

    #[async_trait]
    impl FtpLineDataReceiver for VecReceiver {
        async fn recv_line(&mut self, line: &str) {
            self.lines.push(line.trim_end().to_string());
        }

        fn should_return_early(&self) -> bool {
            self.limit.map(|l| self.lines.len() >= l).unwrap_or(false)
        }

        fn skip_invalid_line(&mut self, line_no: usize) {
            self.invalid.push(line_no);
        }
    }

    fn config(max_entries: usize) -> FtpTransferConfig {
        FtpTransferConfig {
            list_max_entries: max_entries,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skip_non_utf8_line() {
        let stream = tokio_test::io::Builder::new()
            .read(b"-rw-r--r-- 1 ftp ftp 10 Mar 01 2018 a.txt\r\n")
            .read(b"-rw-r--r-- 1 ftp ftp 4 Mar 01 2018 caf\xe9.txt\r\n")
            .read(b"drwxr-xr-x 2 ftp ftp 4096 Mar 01 2018 sub\r\n")
            .build();
        let transfer = FtpLineDataTransfer::new(stream, &config(16));
        let mut receiver = VecReceiver::default();
        transfer.read_to_end(&mut receiver).await.unwrap();
        assert_eq!(
            receiver.lines,
            vec![
                "-rw-r--r-- 1 ftp ftp 10 Mar 01 2018 a.txt",
                "drwxr-xr-x 2 ftp ftp 4096 Mar 01 2018 sub",
            ]
        );
        assert_eq!(receiver.invalid, vec![2]);
    }

    #[tokio::test]
    async fn skip_too_long_line() {
        let config = FtpTransferConfig {
            list_max_line_len: 8,
            list_max_entries: 16,
            ..Default::default()
        };
        let stream = tokio_test::io::Builder::new()
            .read(b"short\n0123456789abcdefghij")
            .read(b"klmnop\nnext\n")
            .build();
        let transfer = FtpLineDataTransfer::new(stream, &config);
        let mut receiver = VecReceiver::default();
        transfer.read_to_end(&mut receiver).await.unwrap();
        assert_eq!(receiver.lines, vec!["short", "next"]);
        assert_eq!(receiver.invalid, vec![2]);

        // overlong last line without line ending
        let stream = tokio_test::io::Builder::new()
            .read(b"short\n0123456789abcdefghij")
            .build();
        let transfer = FtpLineDataTransfer::new(stream, &config);
        let mut receiver = VecReceiver::default();
        transfer.read_to_end(&mut receiver).await.unwrap();
        assert_eq!(receiver.lines, vec!["short"]);
        assert_eq!(receiver.invalid, vec![2]);
    }

    #[tokio::test]
    async fn read_all_lines() {
        let stream = tokio_test::io::Builder::new()
            .read(b"line one\r\nline ")
            .read(b"two\r\nlast")
            .build();
        let transfer = FtpLineDataTransfer::new(stream, &config(16));
        let mut receiver = VecReceiver::default();
        transfer.read_to_end(&mut receiver).await.unwrap();
        assert_eq!(receiver.lines, vec!["line one", "line two", "last"]);
    }

    #[tokio::test]
    async fn too_many_lines() {
        let stream = tokio_test::io::Builder::new().read(b"a\nb\nc\n").build();
        let transfer = FtpLineDataTransfer::new(stream, &config(2));
        let mut receiver = VecReceiver::default();
        let e = transfer.read_to_end(&mut receiver).await.unwrap_err();
        assert!(matches!(e, FtpLineDataReadError::TooManyLines));

        let stream = tokio_test::io::Builder::new().read(b"a\nb\n").build();
        let transfer = FtpLineDataTransfer::new(stream, &config(2));
        let mut receiver = VecReceiver::default();
        transfer.read_to_end(&mut receiver).await.unwrap();
        assert_eq!(receiver.lines.len(), 2);
    }

    #[tokio::test]
    async fn aborted_by_receiver() {
        let stream = tokio_test::io::Builder::new().read(b"a\nb\nc\n").build();
        let transfer = FtpLineDataTransfer::new(stream, &config(16));
        let mut receiver = VecReceiver {
            limit: Some(1),
            ..Default::default()
        };
        let e = transfer.read_to_end(&mut receiver).await.unwrap_err();
        assert!(matches!(e, FtpLineDataReadError::AbortedByCallback));
        assert_eq!(receiver.lines, vec!["a"]);
    }
}
