/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

pub const FTP_DEFAULT_PORT: u16 = 21;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FtpServerAddrParseError {
    #[error("empty host")]
    EmptyHost,
    #[error("invalid port")]
    InvalidPort,
    #[error("unclosed ipv6 bracket")]
    UnclosedBracket,
}

/// Host and port of a FTP server, or of one of its data ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FtpServerAddr {
    host: String,
    port: u16,
}

impl FtpServerAddr {
    pub fn new(host: &str, port: u16) -> Self {
        let host = host
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(host);
        FtpServerAddr {
            host: host.to_string(),
            port,
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn with_port(&self, port: u16) -> Self {
        FtpServerAddr {
            host: self.host.clone(),
            port,
        }
    }

    fn is_ipv6(&self) -> bool {
        matches!(IpAddr::from_str(&self.host), Ok(IpAddr::V6(_)))
    }
}

impl fmt::Display for FtpServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ipv6() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for FtpServerAddr {
    type Err = FtpServerAddrParseError;

    /// Port 0 is used if no port is present, the caller should fill in a default one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(FtpServerAddrParseError::EmptyHost);
        }

        if let Some(left) = s.strip_prefix('[') {
            let Some((host, tail)) = left.split_once(']') else {
                return Err(FtpServerAddrParseError::UnclosedBracket);
            };
            if host.is_empty() {
                return Err(FtpServerAddrParseError::EmptyHost);
            }
            let port = match tail.strip_prefix(':') {
                Some(p) => u16::from_str(p).map_err(|_| FtpServerAddrParseError::InvalidPort)?,
                None if tail.is_empty() => 0,
                None => return Err(FtpServerAddrParseError::InvalidPort),
            };
            return Ok(FtpServerAddr::new(host, port));
        }

        if Ipv6Addr::from_str(s).is_ok() {
            return Ok(FtpServerAddr::new(s, 0));
        }

        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(FtpServerAddrParseError::EmptyHost);
                }
                let port = u16::from_str(port).map_err(|_| FtpServerAddrParseError::InvalidPort)?;
                Ok(FtpServerAddr::new(host, port))
            }
            None => Ok(FtpServerAddr::new(s, 0)),
        }
    }
}
