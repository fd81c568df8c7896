/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

#[cfg(feature = "yaml")]
pub mod yaml;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FtpControlConfig {
    pub(crate) max_line_len: usize,
    pub(crate) max_multi_lines: usize,
    pub(crate) command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 128,
            command_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FtpTransferConfig {
    pub(crate) list_max_line_len: usize,
    pub(crate) list_max_entries: usize,
    pub(crate) list_all_timeout: Duration,
    pub(crate) end_wait_timeout: Duration,
    pub(crate) data_connect_timeout: Duration,
    pub(crate) data_idle_timeout: Duration,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_line_len: 2048,
            list_max_entries: 1024 * 64,
            list_all_timeout: Duration::from_secs(120),
            end_wait_timeout: Duration::from_secs(10),
            data_connect_timeout: Duration::from_secs(30),
            data_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl FtpTransferConfig {
    #[inline]
    pub fn data_idle_timeout(&self) -> Duration {
        self.data_idle_timeout
    }

    /// Longest wait for the next chunk of RETR data.
    #[inline]
    pub fn set_data_idle_timeout(&mut self, timeout: Duration) {
        self.data_idle_timeout = timeout;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FtpClientConfig {
    pub(crate) control: FtpControlConfig,
    pub(crate) transfer: FtpTransferConfig,
    pub(crate) connect_timeout: Duration,
    pub(crate) greeting_timeout: Duration,
    pub(crate) always_try_epsv: bool,
}

impl Default for FtpClientConfig {
    fn default() -> Self {
        FtpClientConfig {
            control: FtpControlConfig::default(),
            transfer: FtpTransferConfig::default(),
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            always_try_epsv: true,
        }
    }
}

impl FtpClientConfig {
    #[inline]
    pub fn transfer(&self) -> &FtpTransferConfig {
        &self.transfer
    }

    #[inline]
    pub fn transfer_mut(&mut self) -> &mut FtpTransferConfig {
        &mut self.transfer
    }

    /// Bound the whole connect stage and every control reply by `timeout`
    pub fn set_io_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
        self.greeting_timeout = timeout;
        self.control.command_timeout = timeout;
        self.transfer.data_connect_timeout = timeout;
    }
}
