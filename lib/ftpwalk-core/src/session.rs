/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::mem;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use log::{debug, info, warn};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWrite, BufWriter};

use ftpwalk_proto::{
    FTP_DEFAULT_PORT, FtpClient, FtpClientConfig, FtpCommandError, FtpConnectionProvider,
    FtpFileStatError, FtpServerAddr,
};

use crate::error::{AuthError, ConnectError, ListError, SessionState, TransferError};
use crate::listing::ListingReceiver;
use crate::path::{join_remote, resolve_remote};
use crate::walk::RemoteSource;
use crate::{
    ClassifiedEntry, ClassifyPolicy, Entry, EntryClassifier, ExtensionClassifier, Listing,
    SizeProbe,
};

enum Connection<CP, S>
where
    CP: FtpConnectionProvider<S>,
    S: AsyncRead + AsyncWrite + Unpin,
{
    Idle(CP),
    Connected(FtpClient<CP, S>),
    /// the provider went away with a cancelled connect
    Lost,
}

fn stat_channel_broken(e: &FtpFileStatError) -> bool {
    match e {
        FtpFileStatError::ServiceNotAvailable => true,
        FtpFileStatError::RawCommandError(e) => e.is_channel_broken(),
        FtpFileStatError::FileUnavailable => false,
    }
}

/// One control connection to a FTP server.
///
/// All operations are serialized by `&mut self`. A session must be closed
/// explicitly, see [`Session::close`] and [`Session::scoped`].
pub struct Session<CP, S>
where
    CP: FtpConnectionProvider<S>,
    S: AsyncRead + AsyncWrite + Unpin,
{
    config: FtpClientConfig,
    conn: Connection<CP, S>,
    state: SessionState,
    cwd: Option<String>,
    classifier: Arc<dyn EntryClassifier>,
    policy: ClassifyPolicy,
    cwd_listing: Option<Listing>,
}

impl<CP, S> Session<CP, S>
where
    CP: FtpConnectionProvider<S> + Send,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(conn_provider: CP) -> Self {
        Session {
            config: FtpClientConfig::default(),
            conn: Connection::Idle(conn_provider),
            state: SessionState::Disconnected,
            cwd: None,
            classifier: Arc::new(ExtensionClassifier),
            policy: ClassifyPolicy::default(),
            cwd_listing: None,
        }
    }

    pub fn with_config(mut self, config: FtpClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default extension based classifier.
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: EntryClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_policy(mut self, policy: ClassifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// The tracked remote working directory, if the server reported it.
    #[inline]
    pub fn current_dir(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    /// Open the control connection. Port 0 selects the default FTP port.
    ///
    /// `timeout` bounds the connect stage and every later command reply.
    /// The connection provider moves into the pending connect, so cancelling
    /// the returned future loses it: every later `connect` then fails with
    /// [`ConnectError::ProviderLost`]. Use `timeout` rather than an outer
    /// timer to bound it.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), ConnectError> {
        let conn_provider = match mem::replace(&mut self.conn, Connection::Lost) {
            Connection::Idle(p) => p,
            c @ Connection::Connected(_) => {
                self.conn = c;
                return Err(ConnectError::AlreadyConnected);
            }
            Connection::Lost => return Err(ConnectError::ProviderLost),
        };

        let port = if port == 0 { FTP_DEFAULT_PORT } else { port };
        let server = FtpServerAddr::new(host, port);
        if server.host().is_empty() {
            self.conn = Connection::Idle(conn_provider);
            return Err(ConnectError::InvalidAddress(host.to_string()));
        }

        let mut config = self.config;
        config.set_io_timeout(timeout);
        match FtpClient::connect_to(server, conn_provider, &config).await {
            Ok(client) => {
                debug!("connected to {}", client.server());
                self.conn = Connection::Connected(client);
                self.state = SessionState::Connected;
                Ok(())
            }
            Err((e, conn_provider)) => {
                self.conn = Connection::Idle(conn_provider);
                Err(e.into())
            }
        }
    }

    /// Authenticate on a connected session. A rejected login drops the connection.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.state != SessionState::Connected {
            return Err(AuthError::InvalidState(self.state));
        }
        let Connection::Connected(client) = &mut self.conn else {
            return Err(AuthError::InvalidState(SessionState::Disconnected));
        };

        if let Err(e) = client
            .new_user_session(Some(username), Some(password))
            .await
        {
            warn!("login as {username} failed: {e}");
            self.drop_connection();
            return Err(e.into());
        }

        let pwd = client.print_working_dir().await;
        self.state = SessionState::Authenticated;
        match pwd {
            Ok(dir) => {
                debug!("logged in as {username}, working dir {dir}");
                self.cwd = Some(dir);
            }
            Err(e) if e.is_channel_broken() => {
                self.drop_connection();
                return Err(AuthError::Rejected(e.into()));
            }
            Err(e) => debug!("logged in as {username}, unknown working dir: {e}"),
        }
        Ok(())
    }

    fn ready_client(&mut self) -> Result<&mut FtpClient<CP, S>, SessionState> {
        match (&mut self.conn, self.state) {
            (Connection::Connected(client), SessionState::Authenticated) => Ok(client),
            (_, state) => Err(state),
        }
    }

    fn reset_state(&mut self) {
        self.state = SessionState::Disconnected;
        self.cwd = None;
        self.cwd_listing = None;
    }

    /// Drop the control connection without QUIT, the channel is not usable any more.
    fn drop_connection(&mut self) {
        self.conn = match mem::replace(&mut self.conn, Connection::Lost) {
            Connection::Connected(client) => {
                warn!("drop connection to {}", client.server());
                Connection::Idle(client.into_provider())
            }
            c => c,
        };
        self.reset_state();
    }

    /// Parse the LIST output of `path`, malformed lines are skipped.
    pub async fn list_entries(&mut self, path: &str) -> Result<Vec<Entry>, ListError> {
        let target = resolve_remote(self.cwd.as_deref(), path);
        let client = self.ready_client().map_err(ListError::not_ready)?;

        let mut receiver = ListingReceiver::new(Local::now().date_naive());
        if let Err(e) = client.list_directory_detailed(&target, &mut receiver).await {
            if e.is_channel_broken() {
                self.drop_connection();
            }
            return Err(ListError::from_list(&target, e));
        }
        if receiver.skipped() > 0 {
            debug!("{} lines skipped in listing of {target}", receiver.skipped());
        }
        Ok(receiver.into_entries())
    }

    /// List and classify `path`.
    ///
    /// The listing of the current directory, requested with an empty path, is
    /// cached until the directory changes or the session is closed.
    pub async fn list_classified(&mut self, path: &str) -> Result<Listing, ListError> {
        if path.is_empty() {
            if let Some(listing) = &self.cwd_listing {
                return Ok(listing.clone());
            }
        }

        let entries = self.list_entries(path).await?;
        let base = resolve_remote(self.cwd.as_deref(), path);
        let classifier = self.classifier.clone();
        let mut classified = Vec::with_capacity(entries.len());
        for entry in entries {
            let verdict = classifier.classify(&entry);
            let kind = if self.policy.should_probe(&verdict) {
                let probe = self.probe_size(&join_remote(&base, entry.name())).await?;
                verdict.confirm(probe)
            } else {
                verdict.kind()
            };
            classified.push(ClassifiedEntry::new(entry, kind));
        }

        let listing = Listing::new(classified);
        if path.is_empty() {
            self.cwd_listing = Some(listing.clone());
        }
        Ok(listing)
    }

    pub async fn list_files(&mut self, path: &str) -> Result<Vec<Entry>, ListError> {
        let (files, _) = self.list_classified(path).await?.into_parts();
        Ok(files)
    }

    pub async fn list_directories(&mut self, path: &str) -> Result<Vec<Entry>, ListError> {
        let (_, dirs) = self.list_classified(path).await?.into_parts();
        Ok(dirs)
    }

    /// Send SIZE for `path`.
    ///
    /// A negative reply means there is no plain file at `path`. A server
    /// without SIZE, or with a malformed size, gives no answer. Failures of
    /// the control channel and of the login state are returned as error.
    pub async fn probe_size(&mut self, path: &str) -> Result<SizeProbe, ListError> {
        let target = resolve_remote(self.cwd.as_deref(), path);
        let client = self.ready_client().map_err(ListError::not_ready)?;

        match client.request_size(&target).await {
            Ok(Some(size)) => Ok(SizeProbe::Sized(size)),
            Ok(None) => Ok(SizeProbe::NoSize),
            // no usable answer, keep the guess
            Err(
                FtpCommandError::CommandNotImplemented(_) | FtpCommandError::InvalidReplySyntax(..),
            ) => Ok(SizeProbe::Unsupported),
            Err(e) => {
                if e.is_channel_broken() {
                    self.drop_connection();
                }
                Err(e.into())
            }
        }
    }

    /// Change the remote working directory and refresh it from the server.
    pub async fn change_dir(&mut self, path: &str) -> Result<(), ListError> {
        let target = resolve_remote(self.cwd.as_deref(), path);
        let client = self.ready_client().map_err(ListError::not_ready)?;

        let result = match client.change_working_dir(&target).await {
            Ok(_) => Ok(client.print_working_dir().await),
            Err(e) => Err(e),
        };
        self.cwd_listing = None;
        match result {
            Ok(Ok(dir)) => {
                debug!("working dir changed to {dir}");
                self.cwd = Some(dir);
                Ok(())
            }
            Ok(Err(e)) if e.is_channel_broken() => {
                self.drop_connection();
                Err(e.into())
            }
            Ok(Err(e)) => {
                debug!("unable to get working dir after CWD {target}: {e}");
                self.cwd = target.starts_with('/').then_some(target);
                Ok(())
            }
            Err(e) => {
                if stat_channel_broken(&e) {
                    self.drop_connection();
                }
                Err(ListError::from_stat(&target, e))
            }
        }
    }

    /// Download `remote_path` in binary mode into `local_path`, returns the
    /// number of bytes written.
    ///
    /// Missing parent directories of `local_path` are created. The local file
    /// is removed if the transfer fails.
    pub async fn download_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<u64, TransferError> {
        let target = resolve_remote(self.cwd.as_deref(), remote_path);
        if !self.is_authenticated() {
            return Err(TransferError::not_ready(self.state));
        }

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = File::create(local_path).await?;
        let mut writer = BufWriter::new(file);

        let client = self.ready_client().map_err(TransferError::not_ready)?;
        let result = client.retrieve_file(&target, &mut writer).await;
        drop(writer);

        match result {
            Ok(size) => {
                info!("downloaded {target} to {} ({size} bytes)", local_path.display());
                Ok(size)
            }
            Err(e) => {
                if let Err(re) = fs::remove_file(local_path).await {
                    debug!("unable to remove {}: {re}", local_path.display());
                }
                if e.is_channel_broken() {
                    self.drop_connection();
                }
                Err(TransferError::from_retrieve(&target, e))
            }
        }
    }

    /// Send QUIT and release the control connection. Calling it on a closed
    /// session does nothing.
    ///
    /// Cancelling the returned future leaves the session connected, a later
    /// call closes it again.
    pub async fn close(&mut self) {
        if let Connection::Connected(client) = &mut self.conn {
            match client.quit().await {
                Ok(_) => debug!("closed connection to {}", client.server()),
                Err(e) => debug!("QUIT to {} failed: {e}", client.server()),
            }
        }
        self.conn = match mem::replace(&mut self.conn, Connection::Lost) {
            Connection::Connected(client) => Connection::Idle(client.into_provider()),
            c => c,
        };
        self.reset_state();
    }

    /// Run `f` against this session and close the session afterwards, no
    /// matter what `f` returned.
    pub async fn scoped<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: for<'a> FnOnce(&'a mut Self) -> Pin<Box<dyn Future<Output = Result<T, E>> + 'a>>,
    {
        let r = f(self).await;
        self.close().await;
        r
    }
}

#[async_trait]
impl<CP, S> RemoteSource for Session<CP, S>
where
    CP: FtpConnectionProvider<S> + Send,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn is_usable(&self) -> bool {
        self.is_authenticated()
    }

    async fn list_dir(&mut self, path: &str) -> Result<Listing, ListError> {
        self.list_classified(path).await
    }

    async fn fetch_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<u64, TransferError> {
        self.download_file(remote_path, local_path).await
    }
}
