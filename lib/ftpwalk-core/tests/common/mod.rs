/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

use ftpwalk_core::Session;
use ftpwalk_proto::{FtpConnectionProvider, FtpServerAddr};

pub const USER: &str = "walker";
pub const PASS: &str = "secret";
pub const TIMEOUT: Duration = Duration::from_secs(5);

const BUF_SIZE: usize = 64 * 1024;

type Children = Vec<(String, Option<Vec<u8>>)>;

/// An in-memory FTP server, one task per control connection.
#[derive(Default)]
pub struct FakeServer {
    dirs: HashMap<String, Children>,
    denied: HashSet<String>,
    aborted_files: HashSet<String>,
    hang_up_on_list: Option<String>,
    raw_list_lines: HashMap<String, Vec<Vec<u8>>>,
    size_reply_for_dirs: Option<String>,
    no_epsv: bool,
    no_greeting: bool,
    commands: Mutex<Vec<(String, String)>>,
}

impl FakeServer {
    pub fn new() -> Self {
        FakeServer::default()
    }

    /// `None` content marks a sub directory.
    pub fn dir(mut self, path: &str, children: &[(&str, Option<&str>)]) -> Self {
        let children = children
            .iter()
            .map(|(name, data)| (name.to_string(), data.map(|d| d.as_bytes().to_vec())))
            .collect();
        self.dirs.insert(path.to_string(), children);
        self
    }

    pub fn deny(mut self, path: &str) -> Self {
        self.denied.insert(path.to_string());
        self
    }

    /// RETR of `path` sends half of the data and then 426.
    pub fn abort_file(mut self, path: &str) -> Self {
        self.aborted_files.insert(path.to_string());
        self
    }

    /// Close the control connection on LIST of `path`.
    pub fn hang_up_on_list(mut self, path: &str) -> Self {
        self.hang_up_on_list = Some(path.to_string());
        self
    }

    /// Add an undecodable or otherwise raw line after the first listing line of `path`.
    pub fn raw_list_line(mut self, path: &str, line: &[u8]) -> Self {
        self.raw_list_lines
            .entry(path.to_string())
            .or_default()
            .push(line.to_vec());
        self
    }

    /// Reply to SIZE of anything but a plain file with `reply`, instead of 550.
    pub fn size_reply_for_dirs(mut self, reply: &str) -> Self {
        self.size_reply_for_dirs = Some(reply.to_string());
        self
    }

    pub fn without_epsv(mut self) -> Self {
        self.no_epsv = true;
        self
    }

    pub fn without_greeting(mut self) -> Self {
        self.no_greeting = true;
        self
    }

    /// Arguments of all received `verb` commands.
    pub fn calls(&self, verb: &str) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|(v, _)| v == verb)
            .map(|(_, arg)| arg.clone())
            .collect()
    }

    fn file(&self, path: &str) -> Option<&[u8]> {
        let (parent, name) = split_path(path);
        self.dirs
            .get(parent)?
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, d)| d.as_deref())
    }

    fn listing(&self, path: &str) -> Option<Vec<u8>> {
        if self.denied.contains(path) {
            return None;
        }
        let children = self.dirs.get(path)?;
        let mut s = b"total 8\r\n".to_vec();
        for (i, (name, data)) in children.iter().enumerate() {
            if i == 1 {
                for line in self.raw_list_lines.get(path).into_iter().flatten() {
                    s.extend_from_slice(line);
                    s.extend_from_slice(b"\r\n");
                }
            }
            let line = match data {
                Some(d) => format!(
                    "-rw-r--r--    1 ftp      ftp      {:>8} Mar 01  2018 {name}\r\n",
                    d.len()
                ),
                None => format!("drwxr-xr-x    2 ftp      ftp          4096 Mar 01  2018 {name}\r\n"),
            };
            s.extend_from_slice(line.as_bytes());
        }
        Some(s)
    }
}

fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

fn resolve(cwd: &str, arg: &str) -> String {
    if arg.starts_with('/') {
        arg.to_string()
    } else if arg.is_empty() {
        cwd.to_string()
    } else if cwd.ends_with('/') {
        format!("{cwd}{arg}")
    } else {
        format!("{cwd}/{arg}")
    }
}

async fn reply<W: AsyncWrite + Unpin>(w: &mut W, msg: &str) -> io::Result<()> {
    w.write_all(msg.as_bytes()).await?;
    w.write_all(b"\r\n").await?;
    w.flush().await
}

async fn send_data(mut data: DuplexStream, content: &[u8]) {
    let _ = data.write_all(content).await;
    let _ = data.shutdown().await;
}

async fn serve_control(
    server: Arc<FakeServer>,
    stream: DuplexStream,
    data_tx: mpsc::UnboundedSender<DuplexStream>,
) -> io::Result<()> {
    let (r, mut w) = tokio::io::split(stream);
    let mut r = BufReader::new(r);

    if server.no_greeting {
        let mut line = String::new();
        let _ = r.read_line(&mut line).await;
        return Ok(());
    }
    reply(&mut w, "220 fake ftp ready").await?;

    let mut cwd = "/".to_string();
    let mut user = String::new();
    let mut logged_in = false;
    let mut data: Option<DuplexStream> = None;
    let mut line = String::new();
    loop {
        line.clear();
        if r.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        let (verb, arg) = line.split_once(' ').unwrap_or((line, ""));
        server
            .commands
            .lock()
            .unwrap()
            .push((verb.to_string(), arg.to_string()));

        if !logged_in && !matches!(verb, "USER" | "PASS" | "QUIT") {
            reply(&mut w, "530 please login").await?;
            continue;
        }
        match verb {
            "USER" => {
                user = arg.to_string();
                reply(&mut w, "331 password required").await?;
            }
            "PASS" => {
                if user == USER && arg == PASS {
                    logged_in = true;
                    reply(&mut w, "230 logged in").await?;
                } else {
                    reply(&mut w, "530 login incorrect").await?;
                }
            }
            "PWD" => reply(&mut w, &format!("257 \"{cwd}\" is current directory")).await?,
            "CWD" => {
                let path = resolve(&cwd, arg);
                if server.dirs.contains_key(&path) {
                    cwd = path;
                    reply(&mut w, "250 directory changed").await?;
                } else {
                    reply(&mut w, "550 no such directory").await?;
                }
            }
            "TYPE" => reply(&mut w, &format!("200 type set to {arg}")).await?,
            "EPSV" if server.no_epsv => reply(&mut w, "502 not implemented").await?,
            "EPSV" | "PASV" => {
                let (client_half, server_half) = tokio::io::duplex(BUF_SIZE);
                data = Some(server_half);
                let _ = data_tx.send(client_half);
                if verb == "EPSV" {
                    reply(&mut w, "229 entering extended passive mode (|||40000|)").await?;
                } else {
                    reply(&mut w, "227 entering passive mode (10,0,0,1,156,64)").await?;
                }
            }
            "SIZE" => {
                let path = resolve(&cwd, arg);
                match (server.file(&path), &server.size_reply_for_dirs) {
                    (Some(d), _) => reply(&mut w, &format!("213 {}", d.len())).await?,
                    (None, Some(r)) => reply(&mut w, r).await?,
                    (None, None) => reply(&mut w, "550 not a plain file").await?,
                }
            }
            "LIST" => {
                let path = resolve(&cwd, arg);
                if server.hang_up_on_list.as_deref() == Some(path.as_str()) {
                    return Ok(());
                }
                let Some(stream) = data.take() else {
                    reply(&mut w, "425 use PASV first").await?;
                    continue;
                };
                match server.listing(&path) {
                    Some(listing) => {
                        reply(&mut w, "150 here comes the listing").await?;
                        send_data(stream, &listing).await;
                        reply(&mut w, "226 transfer complete").await?;
                    }
                    None => {
                        drop(stream);
                        reply(&mut w, "550 failed to list directory").await?;
                    }
                }
            }
            "RETR" => {
                let path = resolve(&cwd, arg);
                let Some(stream) = data.take() else {
                    reply(&mut w, "425 use PASV first").await?;
                    continue;
                };
                match server.file(&path) {
                    Some(d) if server.aborted_files.contains(&path) => {
                        reply(&mut w, "150 opening binary mode data connection").await?;
                        send_data(stream, &d[..d.len() / 2]).await;
                        reply(&mut w, "426 connection closed; transfer aborted").await?;
                    }
                    Some(d) => {
                        reply(&mut w, "150 opening binary mode data connection").await?;
                        send_data(stream, d).await;
                        reply(&mut w, "226 transfer complete").await?;
                    }
                    None => {
                        drop(stream);
                        reply(&mut w, "550 failed to open file").await?;
                    }
                }
            }
            "QUIT" => {
                reply(&mut w, "221 goodbye").await?;
                return Ok(());
            }
            _ => reply(&mut w, "502 command not implemented").await?,
        }
    }
}

/// Connects to a [`FakeServer`] over in-memory streams.
pub struct FakeProvider {
    server: Arc<FakeServer>,
    data_rx: Option<mpsc::UnboundedReceiver<DuplexStream>>,
    refuse: bool,
    pub connected: Vec<String>,
}

impl FakeProvider {
    pub fn new(server: Arc<FakeServer>) -> Self {
        FakeProvider {
            server,
            data_rx: None,
            refuse: false,
            connected: Vec::new(),
        }
    }

    pub fn refusing(server: Arc<FakeServer>) -> Self {
        FakeProvider {
            refuse: true,
            ..FakeProvider::new(server)
        }
    }
}

#[async_trait]
impl FtpConnectionProvider<DuplexStream> for FakeProvider {
    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> io::Result<DuplexStream> {
        if self.refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }
        self.connected.push(server.to_string());
        let (client_half, server_half) = tokio::io::duplex(BUF_SIZE);
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        self.data_rx = Some(data_rx);
        tokio::spawn(serve_control(self.server.clone(), server_half, data_tx));
        Ok(client_half)
    }

    async fn new_data_connection(&mut self, data_addr: &FtpServerAddr) -> io::Result<DuplexStream> {
        self.connected.push(data_addr.to_string());
        let rx = self
            .data_rx
            .as_mut()
            .ok_or_else(|| io::Error::other("no control connection"))?;
        rx.recv()
            .await
            .ok_or_else(|| io::Error::other("control connection closed"))
    }
}

pub type FakeSession = Session<FakeProvider, DuplexStream>;

pub async fn logged_in(server: &Arc<FakeServer>) -> FakeSession {
    let mut session = Session::new(FakeProvider::new(server.clone()));
    session.connect("ftp.example.net", 0, TIMEOUT).await.unwrap();
    session.login(USER, PASS).await.unwrap();
    session
}

pub fn temp_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ftpwalk-{tag}-{}", fastrand::u64(..)))
}
