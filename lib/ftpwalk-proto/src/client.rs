/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::control::FtpControlChannel;
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileRetrieveStartError, FtpFileStatError, FtpSessionOpenError, FtpTransferServerError,
    FtpTransferSetupError,
};
use crate::transfer::{FtpFileDataTransfer, FtpLineDataTransfer};
use crate::{
    FTP_DEBUG_LOG_TARGET, FtpClientConfig, FtpConnectionProvider, FtpLineDataReceiver,
    FtpServerAddr, FtpTransferType,
};

pub struct FtpClient<CP, S>
where
    CP: FtpConnectionProvider<S>,
    S: AsyncRead + AsyncWrite + Unpin,
{
    server: FtpServerAddr,
    config: FtpClientConfig,
    conn_provider: CP,
    control: FtpControlChannel<S>,
    transfer_type: Option<FtpTransferType>,
    epsv_unsupported: bool,
}

impl<CP, S> FtpClient<CP, S>
where
    CP: FtpConnectionProvider<S>,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The connection provider is handed back on failure so that it can be reused.
    pub async fn connect_to(
        server: FtpServerAddr,
        mut conn_provider: CP,
        config: &FtpClientConfig,
    ) -> Result<Self, (FtpConnectError, CP)> {
        let stream = match tokio::time::timeout(
            config.connect_timeout,
            conn_provider.new_control_connection(&server),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err((FtpConnectError::ConnectIoError(e), conn_provider)),
            Err(_) => return Err((FtpConnectError::ConnectTimedOut, conn_provider)),
        };

        let mut control = FtpControlChannel::new(stream, config.control);
        match tokio::time::timeout(config.greeting_timeout, control.wait_greetings()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err((e.into(), conn_provider)),
            Err(_) => return Err((FtpConnectError::GreetingTimedOut, conn_provider)),
        }
        debug!(target: FTP_DEBUG_LOG_TARGET, "connected to {server}");

        Ok(FtpClient {
            server,
            config: *config,
            conn_provider,
            control,
            transfer_type: None,
            epsv_unsupported: !config.always_try_epsv,
        })
    }

    #[inline]
    pub fn server(&self) -> &FtpServerAddr {
        &self.server
    }

    #[inline]
    pub fn config(&self) -> &FtpClientConfig {
        &self.config
    }

    pub async fn new_user_session(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), FtpSessionOpenError> {
        self.transfer_type = None;

        let status = match self.control.send_username(username).await? {
            FtpAuthStatus::NeedPassword => self.control.send_password(password).await?,
            s => s,
        };
        match status {
            FtpAuthStatus::LoggedIn => Ok(()),
            FtpAuthStatus::NeedAccount => Err(FtpSessionOpenError::AccountRequired),
            FtpAuthStatus::Rejected | FtpAuthStatus::NeedPassword => {
                Err(FtpSessionOpenError::Rejected)
            }
        }
    }

    pub async fn print_working_dir(&mut self) -> Result<String, FtpCommandError> {
        self.control.print_working_dir().await
    }

    pub async fn change_working_dir(&mut self, path: &str) -> Result<(), FtpFileStatError> {
        self.control.change_dir(path).await
    }

    /// `None` means the server has no size for this path, which is the case for directories.
    /// Every negative reply except 421, 502 and 530 yields `None`.
    pub async fn request_size(&mut self, path: &str) -> Result<Option<u64>, FtpCommandError> {
        self.control.request_size(path).await
    }

    /// TYPE is only sent if the requested type differs from the one in use.
    pub async fn use_transfer_type(&mut self, t: FtpTransferType) -> Result<(), FtpCommandError> {
        if self.transfer_type == Some(t) {
            return Ok(());
        }
        self.control.request_transfer_type(t).await?;
        self.transfer_type = Some(t);
        Ok(())
    }

    async fn request_passive_port(&mut self) -> Result<u16, FtpCommandError> {
        if !self.epsv_unsupported {
            match self.control.request_epsv_port().await {
                Ok(port) => return Ok(port),
                Err(
                    FtpCommandError::CommandNotImplemented(_)
                    | FtpCommandError::RejectedCommandSyntax(_),
                ) => {
                    debug!(target: FTP_DEBUG_LOG_TARGET, "EPSV unsupported, fall back to PASV");
                    self.epsv_unsupported = true;
                }
                Err(e) => return Err(e),
            }
        }

        // the address in PASV reply is not trusted, only the port is used
        let addr = self.control.request_pasv_port().await?;
        Ok(addr.port())
    }

    async fn new_data_stream(&mut self) -> Result<S, FtpTransferSetupError> {
        let port = self.request_passive_port().await?;
        let data_addr = self.server.with_port(port);
        match tokio::time::timeout(
            self.config.transfer.data_connect_timeout,
            self.conn_provider.new_data_connection(&data_addr),
        )
        .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(FtpTransferSetupError::ConnectFailed(e)),
            Err(_) => Err(FtpTransferSetupError::ConnectTimedOut),
        }
    }

    pub async fn list_directory_detailed<R>(
        &mut self,
        path: &str,
        receiver: &mut R,
    ) -> Result<(), FtpFileListError>
    where
        R: FtpLineDataReceiver + Send,
    {
        let data_stream = self
            .new_data_stream()
            .await
            .map_err(FtpFileRetrieveStartError::from)?;
        self.control.start_list(path).await?;

        let transfer = FtpLineDataTransfer::new(data_stream, &self.config.transfer);
        let data_result = match tokio::time::timeout(
            self.config.transfer.list_all_timeout,
            transfer.read_to_end(receiver),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(FtpFileListError::from(e)),
            Err(_) => Err(FtpFileListError::TimeoutToWaitAllData),
        };

        // the data stream has been dropped, so the server will always send the end reply
        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_list(),
        )
        .await
        {
            Ok(Ok(_)) => data_result,
            Ok(Err(e @ FtpTransferServerError::RecvFailed(_))) => Err(e.into()),
            Ok(Err(e)) => data_result.and(Err(e.into())),
            Err(_) => Err(FtpFileListError::TimeoutToWaitEndReply),
        }
    }

    /// Retrieve a file in binary mode, returns the number of bytes written to `writer`.
    pub async fn retrieve_file<W>(
        &mut self,
        path: &str,
        writer: &mut W,
    ) -> Result<u64, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin,
    {
        self.use_transfer_type(FtpTransferType::Image)
            .await
            .map_err(FtpFileRetrieveStartError::from)?;
        let data_stream = self
            .new_data_stream()
            .await
            .map_err(FtpFileRetrieveStartError::from)?;
        self.control.start_retrieve(path).await?;

        let transfer = FtpFileDataTransfer::new(data_stream, &self.config.transfer);
        let data_result = transfer.copy_to(writer).await;

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_retrieve(),
        )
        .await
        {
            Ok(Ok(_)) => data_result,
            Ok(Err(e @ FtpTransferServerError::RecvFailed(_))) => Err(e.into()),
            Ok(Err(e)) => data_result.and(Err(e.into())),
            Err(_) => Err(FtpFileRetrieveError::TimeoutToWaitEndReply),
        }
    }

    /// Send QUIT, the control connection is not usable afterwards.
    pub async fn quit(&mut self) -> Result<(), FtpCommandError> {
        self.control.send_quit().await
    }

    /// Close the control connection and hand the connection provider back.
    pub fn into_provider(self) -> CP {
        self.conn_provider
    }
}
