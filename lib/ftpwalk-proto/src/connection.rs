/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::FtpServerAddr;

#[async_trait]
pub trait FtpConnectionProvider<T: AsyncRead + AsyncWrite> {
    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> io::Result<T>;

    /// `data_addr` carries the control host and the passive port announced by the server
    async fn new_data_connection(&mut self, data_addr: &FtpServerAddr) -> io::Result<T>;
}
