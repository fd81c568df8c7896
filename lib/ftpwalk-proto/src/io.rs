/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read until `delimiter` (included) or until `max_len` bytes have been appended to `buf`.
///
/// Returns whether the delimiter was found and how many bytes were read.
/// A zero length means EOF was reached before any data.
pub(crate) async fn limited_read_until<R>(
    reader: &mut R,
    delimiter: u8,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> io::Result<(bool, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0usize;
    loop {
        let (found, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok((false, total));
            }
            let left = max_len.saturating_sub(total);
            let scan = &available[..available.len().min(left)];
            match memchr::memchr(delimiter, scan) {
                Some(i) => {
                    buf.extend_from_slice(&scan[..=i]);
                    (true, i + 1)
                }
                None => {
                    buf.extend_from_slice(scan);
                    (false, scan.len())
                }
            }
        };
        reader.consume(used);
        total += used;

        if found || total >= max_len {
            return Ok((found, total));
        }
    }
}
