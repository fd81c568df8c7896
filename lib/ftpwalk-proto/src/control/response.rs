/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use super::FtpControlChannel;
use crate::error::FtpRawResponseError;
use crate::io::limited_read_until;

#[derive(Debug)]
pub(super) enum FtpRawResponse {
    SingleLine(u16, String),
    MultiLine(u16, Vec<String>),
}

fn parse_reply_code(line: &[u8]) -> Result<u16, FtpRawResponseError> {
    let mut code = 0u16;
    for c in &line[0..3] {
        if !c.is_ascii_digit() {
            return Err(FtpRawResponseError::MalformedLine);
        }
        code = code * 10 + (*c - b'0') as u16;
    }
    if !(100..600).contains(&code) {
        return Err(FtpRawResponseError::CodeOutOfRange(code));
    }
    Ok(code)
}

fn find_parentheses(line: &str) -> Option<&str> {
    let p_start = memchr::memchr(b'(', line.as_bytes())?;
    let p_end = memchr::memchr(b')', &line.as_bytes()[p_start..])? + p_start;
    Some(&line[p_start + 1..p_end])
}

impl FtpRawResponse {
    pub(super) fn parse_single_line(line: &[u8]) -> Result<Self, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let msg = std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::NotUtf8)?;
        Ok(FtpRawResponse::SingleLine(code, msg.trim_end().to_string()))
    }

    pub(super) fn get_multi_line_parser(
        line: &[u8],
        max_lines: usize,
    ) -> Result<FtpMultiLineReplyParser, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let end_prefix = [line[0], line[1], line[2], b' '];
        let mut lines = Vec::<String>::with_capacity(max_lines.min(16));
        let msg = std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::NotUtf8)?;
        lines.push(msg.trim_end().to_string());
        Ok(FtpMultiLineReplyParser {
            code,
            end_prefix,
            lines,
        })
    }

    pub(super) fn code(&self) -> u16 {
        match self {
            FtpRawResponse::SingleLine(code, _) => *code,
            FtpRawResponse::MultiLine(code, _) => *code,
        }
    }

    pub(super) fn line_trimmed(&self) -> Option<&str> {
        match self {
            FtpRawResponse::SingleLine(_, line) => Some(line.as_str().trim()),
            FtpRawResponse::MultiLine(_, _) => None,
        }
    }

    /// the last line carries the final text of a multi line reply
    fn last_line(&self) -> &str {
        match self {
            FtpRawResponse::SingleLine(_, line) => line,
            FtpRawResponse::MultiLine(_, lines) => lines.last().map(|s| s.as_str()).unwrap_or(""),
        }
    }

    pub(super) fn parse_pasv_227_reply(&self) -> Option<SocketAddr> {
        let inner = find_parentheses(self.last_line())?;

        let a: Vec<&str> = inner.split(',').collect();
        if a.len() != 6 {
            return None;
        }

        let h1 = u8::from_str(a[0].trim()).ok()?;
        let h2 = u8::from_str(a[1].trim()).ok()?;
        let h3 = u8::from_str(a[2].trim()).ok()?;
        let h4 = u8::from_str(a[3].trim()).ok()?;
        let p1 = u8::from_str(a[4].trim()).ok()?;
        let p2 = u8::from_str(a[5].trim()).ok()?;

        let ip = IpAddr::V4(Ipv4Addr::new(h1, h2, h3, h4));
        let port = ((p1 as u16) << 8) + (p2 as u16);
        Some(SocketAddr::new(ip, port))
    }

    pub(super) fn parse_epsv_229_reply(&self) -> Option<u16> {
        let inner = find_parentheses(self.last_line())?;

        let port = inner.strip_prefix("|||")?.strip_suffix('|')?;
        u16::from_str(port).ok()
    }

    /// `257 "<path>" comment`, with embedded quotes doubled
    pub(super) fn parse_pwd_257_reply(&self) -> Option<String> {
        let line = self.last_line();
        let start = memchr::memchr(b'"', line.as_bytes())?;

        let mut path = String::with_capacity(line.len());
        let mut chars = line[start + 1..].chars().peekable();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    path.push('"');
                } else {
                    return Some(path);
                }
            } else {
                path.push(c);
            }
        }

        None
    }
}

pub(super) struct FtpMultiLineReplyParser {
    code: u16,
    end_prefix: [u8; 4],
    lines: Vec<String>,
}

impl FtpMultiLineReplyParser {
    pub(super) fn feed_line(&mut self, line: &[u8]) -> Result<bool, FtpRawResponseError> {
        if line.starts_with(&self.end_prefix) {
            let msg = std::str::from_utf8(&line[4..]).map_err(|_| FtpRawResponseError::NotUtf8)?;
            self.lines.push(msg.trim_end().to_string());
            Ok(true)
        } else {
            let msg = std::str::from_utf8(line).map_err(|_| FtpRawResponseError::NotUtf8)?;
            // do not trim whitespace at beginning
            self.lines.push(msg.trim_end().to_string());
            Ok(false)
        }
    }

    pub(super) fn finish(self) -> FtpRawResponse {
        FtpRawResponse::MultiLine(self.code, self.lines)
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(
        &mut self,
        buf: &mut Vec<u8>,
        min_len: usize,
    ) -> Result<(), FtpRawResponseError> {
        buf.clear();

        let (found, len) =
            limited_read_until(&mut self.stream, b'\n', self.config.max_line_len, buf)
                .await
                .map_err(FtpRawResponseError::ReadFailed)?;
        if len == 0 {
            return Err(FtpRawResponseError::ConnectionClosed);
        }

        #[cfg(feature = "log-raw-io")]
        crate::debug::log_rsp(buf);

        if !found {
            if len < self.config.max_line_len {
                Err(FtpRawResponseError::ConnectionClosed)
            } else {
                Err(FtpRawResponseError::LineTooLong)
            }
        } else if len < min_len {
            Err(FtpRawResponseError::MalformedLine)
        } else {
            Ok(())
        }
    }

    pub(super) async fn read_raw_response(
        &mut self,
    ) -> Result<FtpRawResponse, FtpRawResponseError> {
        let mut buf = Vec::<u8>::with_capacity(self.config.max_line_len);
        // at least <code><sp|->\n
        self.read_line(&mut buf, 5).await?;

        match buf[3] {
            b' ' | b'\r' | b'\n' => FtpRawResponse::parse_single_line(&buf),
            b'-' => {
                let mut ml_parser =
                    FtpRawResponse::get_multi_line_parser(&buf, self.config.max_multi_lines)?;
                for _i in 0..self.config.max_multi_lines {
                    self.read_line(&mut buf, 1).await?;
                    let end = ml_parser.feed_line(&buf)?;
                    if end {
                        return Ok(ml_parser.finish());
                    }
                }
                Err(FtpRawResponseError::TooManyLines)
            }
            _ => Err(FtpRawResponseError::MalformedLine),
        }
    }

    pub(super) async fn timed_read_raw_response(
        &mut self,
        stage: &'static str,
    ) -> Result<FtpRawResponse, FtpRawResponseError> {
        match tokio::time::timeout(self.config.command_timeout, self.read_raw_response()).await {
            Ok(r) => r,
            Err(_) => Err(FtpRawResponseError::TimedOut(stage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let rsp = FtpRawResponse::parse_single_line(b"213 1024\r\n").unwrap();
        assert_eq!(rsp.code(), 213);
        assert_eq!(rsp.line_trimmed(), Some("1024"));

        assert!(matches!(
            FtpRawResponse::parse_single_line(b"2a3 x\r\n"),
            Err(FtpRawResponseError::MalformedLine)
        ));
        assert!(matches!(
            FtpRawResponse::parse_single_line(b"099 x\r\n"),
            Err(FtpRawResponseError::CodeOutOfRange(99))
        ));
        assert!(matches!(
            FtpRawResponse::parse_single_line(b"250 caf\xe9\r\n"),
            Err(FtpRawResponseError::NotUtf8)
        ));
    }

    #[test]
    fn pasv_reply() {
        let rsp = FtpRawResponse::SingleLine(
            227,
            "Entering Passive Mode (192,168,1,2,19,137).".to_string(),
        );
        let addr = rsp.parse_pasv_227_reply().unwrap();
        assert_eq!(addr, SocketAddr::from_str("192.168.1.2:5001").unwrap());

        let rsp = FtpRawResponse::SingleLine(227, "Entering Passive Mode (1,2,3)".to_string());
        assert!(rsp.parse_pasv_227_reply().is_none());
    }

    #[test]
    fn epsv_reply() {
        let rsp = FtpRawResponse::SingleLine(
            229,
            "Entering Extended Passive Mode (|||6446|)".to_string(),
        );
        assert_eq!(rsp.parse_epsv_229_reply(), Some(6446));

        let rsp = FtpRawResponse::SingleLine(229, "Entering (||6446|)".to_string());
        assert!(rsp.parse_epsv_229_reply().is_none());
    }

    #[test]
    fn pwd_reply() {
        let rsp = FtpRawResponse::SingleLine(257, "\"/pub/data\" is current directory".to_string());
        assert_eq!(rsp.parse_pwd_257_reply().as_deref(), Some("/pub/data"));

        let rsp = FtpRawResponse::SingleLine(257, "\"/a \"\"b\"\"\" created".to_string());
        assert_eq!(rsp.parse_pwd_257_reply().as_deref(), Some("/a \"b\""));

        let rsp = FtpRawResponse::SingleLine(257, "\"/unterminated".to_string());
        assert!(rsp.parse_pwd_257_reply().is_none());
    }

    #[test]
    fn multi_line() {
        let mut parser = FtpRawResponse::get_multi_line_parser(b"211-Features:\r\n", 8).unwrap();
        assert!(!parser.feed_line(b" SIZE\r\n").unwrap());
        assert!(!parser.feed_line(b" EPSV\r\n").unwrap());
        assert!(parser.feed_line(b"211 End\r\n").unwrap());
        let rsp = parser.finish();
        assert_eq!(rsp.code(), 211);
        assert_eq!(rsp.last_line(), "End");
        assert!(rsp.line_trimmed().is_none());
    }
}
