/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite, BufStream};

use crate::FtpControlConfig;
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpFileRetrieveStartError, FtpFileStatError,
    FtpTransferServerError,
};
use crate::transfer::FtpTransferType;

mod response;

mod command;
pub use command::FtpCommand;

pub(crate) struct FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite,
{
    config: FtpControlConfig,
    stream: BufStream<T>,
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: T, config: FtpControlConfig) -> Self {
        FtpControlChannel {
            config,
            stream: BufStream::new(stream),
        }
    }

    pub(crate) async fn wait_greetings(&mut self) -> Result<(), FtpCommandError> {
        loop {
            let reply = self.read_raw_response().await?;
            return match reply.code() {
                120 => continue,
                220 => Ok(()),
                421 => Err(FtpCommandError::ServiceNotAvailable),
                n => Err(FtpCommandError::UnexpectedReplyCode(
                    FtpCommand::GREETING,
                    n,
                )),
            };
        }
    }

    pub(crate) async fn send_username(
        &mut self,
        name: Option<&str>,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::USER;
        let username = name.unwrap_or("anonymous");
        self.send_cmd1(cmd, username)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("send username").await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            530 => Ok(FtpAuthStatus::Rejected),
            230 => Ok(FtpAuthStatus::LoggedIn),
            331 => Ok(FtpAuthStatus::NeedPassword),
            332 => Ok(FtpAuthStatus::NeedAccount),
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn send_password(
        &mut self,
        pass: Option<&str>,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::PASS;
        let password = pass.unwrap_or("xxx");
        self.send_cmd1(cmd, password)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("send password").await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            503 => Err(FtpCommandError::BadCommandSequence(cmd)),
            530 => Ok(FtpAuthStatus::Rejected),
            202 => Err(FtpCommandError::CommandNotImplemented(cmd)), // not fatal but unexpected
            230 => Ok(FtpAuthStatus::LoggedIn),
            332 => Ok(FtpAuthStatus::NeedAccount),
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn send_quit(&mut self) -> Result<(), FtpCommandError> {
        let cmd = FtpCommand::QUIT;
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("send quit").await?;
        match reply.code() {
            500 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            221 => Ok(()),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn change_dir(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        let cmd = FtpCommand::CWD;
        self.send_cmd1(cmd, path)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self
            .timed_read_raw_response("change dir")
            .await
            .map_err(FtpCommandError::RecvFailed)?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd).into()),
            502 => Err(FtpCommandError::CommandNotImplemented(cmd).into()),
            530 => Err(FtpCommandError::NotLoggedIn.into()),
            550 => Err(FtpFileStatError::FileUnavailable),
            200 | 250 => Ok(()),
            421 => Err(FtpFileStatError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n).into()),
        }
    }

    pub(crate) async fn print_working_dir(&mut self) -> Result<String, FtpCommandError> {
        let cmd = FtpCommand::PWD;
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("print working dir").await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            502 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            530 => Err(FtpCommandError::NotLoggedIn),
            257 => reply
                .parse_pwd_257_reply()
                .ok_or(FtpCommandError::InvalidReplySyntax(cmd, 257)),
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn request_size(
        &mut self,
        path: &str,
    ) -> Result<Option<u64>, FtpCommandError> {
        if path.is_empty() {
            return Ok(None);
        }

        let cmd = FtpCommand::SIZE;
        self.send_cmd1(cmd, path)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("request size").await?;
        match reply.code() {
            421 => Err(FtpCommandError::ServiceNotAvailable),
            502 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            530 => Err(FtpCommandError::NotLoggedIn),
            // any other negative completion, the path has no size
            400..=599 => Ok(None),
            213 => {
                if let Some(s) = reply.line_trimmed() {
                    let size = u64::from_str(s)
                        .map_err(|_| FtpCommandError::InvalidReplySyntax(cmd, 213))?;
                    Ok(Some(size))
                } else {
                    Err(FtpCommandError::InvalidReplySyntax(cmd, 213))
                }
            }
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn request_pasv_port(&mut self) -> Result<SocketAddr, FtpCommandError> {
        let cmd = FtpCommand::PASV;
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("request pasv port").await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            502 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            530 => Err(FtpCommandError::NotLoggedIn),
            227 => match reply.parse_pasv_227_reply() {
                Some(addr) => Ok(addr),
                None => Err(FtpCommandError::InvalidReplySyntax(cmd, 227)),
            },
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn request_epsv_port(&mut self) -> Result<u16, FtpCommandError> {
        let cmd = FtpCommand::EPSV;
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self.timed_read_raw_response("request epsv port").await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            502 | 522 => Err(FtpCommandError::CommandNotImplemented(cmd)),
            530 => Err(FtpCommandError::NotLoggedIn),
            229 => match reply.parse_epsv_229_reply() {
                Some(port) => Ok(port),
                None => Err(FtpCommandError::InvalidReplySyntax(cmd, 229)),
            },
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn request_transfer_type(
        &mut self,
        t: FtpTransferType,
    ) -> Result<(), FtpCommandError> {
        let cmd = match t {
            FtpTransferType::Ascii => FtpCommand::TYPE_A,
            FtpTransferType::Image => FtpCommand::TYPE_I,
        };
        self.send_cmd(cmd)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self
            .timed_read_raw_response("request transfer type")
            .await?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd)),
            504 => Err(FtpCommandError::ParameterNotImplemented(cmd)),
            530 => Err(FtpCommandError::NotLoggedIn),
            200 => Ok(()),
            421 => Err(FtpCommandError::ServiceNotAvailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n)),
        }
    }

    pub(crate) async fn start_list(&mut self, path: &str) -> Result<(), FtpFileRetrieveStartError> {
        let cmd = FtpCommand::LIST;
        self.send_cmd1(cmd, path)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self
            .timed_read_raw_response("start list")
            .await
            .map_err(FtpCommandError::RecvFailed)?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd).into()),
            502 => Err(FtpCommandError::CommandNotImplemented(cmd).into()),
            530 => Err(FtpCommandError::NotLoggedIn.into()),
            125 | 150 => Ok(()),
            421 => Err(FtpFileRetrieveStartError::ServiceNotAvailable),
            450 | 550 => Err(FtpFileRetrieveStartError::FileUnavailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n).into()),
        }
    }

    pub(crate) async fn wait_list(&mut self) -> Result<(), FtpTransferServerError> {
        let reply = self.read_raw_response().await?;
        match reply.code() {
            226 | 250 => Ok(()),
            425 => Err(FtpTransferServerError::DataTransferNotEstablished),
            426 => Err(FtpTransferServerError::DataTransferLost),
            451 => Err(FtpTransferServerError::ServerFailed),
            n => Err(FtpTransferServerError::UnexpectedEndReplyCode(
                FtpCommand::LIST,
                n,
            )),
        }
    }

    pub(crate) async fn start_retrieve(
        &mut self,
        path: &str,
    ) -> Result<(), FtpFileRetrieveStartError> {
        let cmd = FtpCommand::RETR;
        self.send_cmd1(cmd, path)
            .await
            .map_err(FtpCommandError::SendFailed)?;

        let reply = self
            .timed_read_raw_response("start retrieve")
            .await
            .map_err(FtpCommandError::RecvFailed)?;
        match reply.code() {
            500 | 501 => Err(FtpCommandError::RejectedCommandSyntax(cmd).into()),
            530 => Err(FtpCommandError::NotLoggedIn.into()),
            550 => Err(FtpFileRetrieveStartError::FileUnavailable),
            125 | 150 => Ok(()),
            421 => Err(FtpFileRetrieveStartError::ServiceNotAvailable),
            450 => Err(FtpFileRetrieveStartError::FileUnavailable),
            n => Err(FtpCommandError::UnexpectedReplyCode(cmd, n).into()),
        }
    }

    pub(crate) async fn wait_retrieve(&mut self) -> Result<(), FtpTransferServerError> {
        let reply = self.read_raw_response().await?;
        match reply.code() {
            110 => Err(FtpTransferServerError::RestartNeeded),
            226 | 250 => Ok(()),
            425 => Err(FtpTransferServerError::DataTransferNotEstablished),
            426 => Err(FtpTransferServerError::DataTransferLost),
            451 => Err(FtpTransferServerError::ServerFailed),
            n => Err(FtpTransferServerError::UnexpectedEndReplyCode(
                FtpCommand::RETR,
                n,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_channel(stream: tokio_test::io::Mock) -> FtpControlChannel<tokio_test::io::Mock> {
        FtpControlChannel::new(stream, FtpControlConfig::default())
    }

    #[tokio::test]
    async fn greeting_with_delay() {
        let stream = tokio_test::io::Builder::new()
            .read(b"120 wait a moment\r\n")
            .read(b"220-welcome\r\n")
            .read(b" to the server\r\n220 ready\r\n")
            .build();
        let mut channel = new_channel(stream);
        channel.wait_greetings().await.unwrap();
    }

    #[tokio::test]
    async fn greeting_rejected() {
        let stream = tokio_test::io::Builder::new()
            .read(b"421 too many users\r\n")
            .build();
        let mut channel = new_channel(stream);
        let e = channel.wait_greetings().await.unwrap_err();
        assert!(matches!(e, FtpCommandError::ServiceNotAvailable));
    }

    #[tokio::test]
    async fn login_flow() {
        let stream = tokio_test::io::Builder::new()
            .write(b"USER alice\r\n")
            .read(b"331 password required\r\n")
            .write(b"PASS secret\r\n")
            .read(b"230 logged in\r\n")
            .build();
        let mut channel = new_channel(stream);
        let status = channel.send_username(Some("alice")).await.unwrap();
        assert_eq!(status, FtpAuthStatus::NeedPassword);
        let status = channel.send_password(Some("secret")).await.unwrap();
        assert_eq!(status, FtpAuthStatus::LoggedIn);
    }

    #[tokio::test]
    async fn login_rejected() {
        let stream = tokio_test::io::Builder::new()
            .write(b"USER bob\r\n")
            .read(b"331 password required\r\n")
            .write(b"PASS wrong\r\n")
            .read(b"530 login incorrect\r\n")
            .build();
        let mut channel = new_channel(stream);
        let status = channel.send_username(Some("bob")).await.unwrap();
        assert_eq!(status, FtpAuthStatus::NeedPassword);
        let status = channel.send_password(Some("wrong")).await.unwrap();
        assert_eq!(status, FtpAuthStatus::Rejected);
    }

    #[tokio::test]
    async fn size_reply_codes() {
        let stream = tokio_test::io::Builder::new()
            .write(b"SIZE a.txt\r\n")
            .read(b"213 10\r\n")
            .write(b"SIZE sub\r\n")
            .read(b"550 not a plain file\r\n")
            .write(b"SIZE pub\r\n")
            .read(b"450 file action not taken\r\n")
            .write(b"SIZE etc\r\n")
            .read(b"553 not allowed\r\n")
            .write(b"SIZE x\r\n")
            .read(b"501 syntax error\r\n")
            .write(b"SIZE y\r\n")
            .read(b"502 not implemented\r\n")
            .build();
        let mut channel = new_channel(stream);
        assert_eq!(channel.request_size("a.txt").await.unwrap(), Some(10));
        assert_eq!(channel.request_size("sub").await.unwrap(), None);
        assert_eq!(channel.request_size("").await.unwrap(), None);
        assert_eq!(channel.request_size("pub").await.unwrap(), None);
        assert_eq!(channel.request_size("etc").await.unwrap(), None);
        assert_eq!(channel.request_size("x").await.unwrap(), None);
        let e = channel.request_size("y").await.unwrap_err();
        assert!(matches!(e, FtpCommandError::CommandNotImplemented(_)));
    }

    #[tokio::test]
    async fn size_reply_not_a_number() {
        let stream = tokio_test::io::Builder::new()
            .write(b"SIZE a.txt\r\n")
            .read(b"213 unknown\r\n")
            .build();
        let mut channel = new_channel(stream);
        let e = channel.request_size("a.txt").await.unwrap_err();
        assert!(matches!(e, FtpCommandError::InvalidReplySyntax(_, 213)));
    }

    #[tokio::test]
    async fn size_reply_broken_channel() {
        let stream = tokio_test::io::Builder::new()
            .write(b"SIZE a.txt\r\n")
            .read(b"421 closing control connection\r\n")
            .build();
        let mut channel = new_channel(stream);
        let e = channel.request_size("a.txt").await.unwrap_err();
        assert!(e.is_channel_broken());
    }

    #[tokio::test]
    async fn change_and_print_dir() {
        let stream = tokio_test::io::Builder::new()
            .write(b"CWD /pub\r\n")
            .read(b"250 ok\r\n")
            .write(b"PWD\r\n")
            .read(b"257 \"/pub\" is current directory\r\n")
            .write(b"CWD /missing\r\n")
            .read(b"550 no such directory\r\n")
            .build();
        let mut channel = new_channel(stream);
        channel.change_dir("/pub").await.unwrap();
        assert_eq!(channel.print_working_dir().await.unwrap(), "/pub");
        let e = channel.change_dir("/missing").await.unwrap_err();
        assert!(matches!(e, FtpFileStatError::FileUnavailable));
    }

    #[tokio::test]
    async fn list_unavailable() {
        let stream = tokio_test::io::Builder::new()
            .write(b"LIST /missing\r\n")
            .read(b"550 no such directory\r\n")
            .build();
        let mut channel = new_channel(stream);
        let e = channel.start_list("/missing").await.unwrap_err();
        assert!(matches!(e, FtpFileRetrieveStartError::FileUnavailable));
    }

    #[tokio::test]
    async fn line_break_in_param() {
        let stream = tokio_test::io::Builder::new().build();
        let mut channel = new_channel(stream);
        let e = channel.request_size("a\r\nDELE b").await.unwrap_err();
        assert!(matches!(e, FtpCommandError::SendFailed(_)));
    }
}
