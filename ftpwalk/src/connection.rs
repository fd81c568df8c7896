/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use log::debug;
use tokio::net::{TcpSocket, TcpStream};

use ftpwalk_proto::{FtpConnectionProvider, FtpServerAddr};

#[derive(Default)]
pub(crate) struct LocalConnectionProvider {
    bind_ip: Option<IpAddr>,
    remote_addr: Option<SocketAddr>,
}

impl LocalConnectionProvider {
    pub(crate) fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }

    fn new_socket_to(&self, peer_ip: IpAddr) -> io::Result<TcpSocket> {
        let socket = match peer_ip {
            IpAddr::V4(_) => TcpSocket::new_v4()?,
            IpAddr::V6(_) => TcpSocket::new_v6()?,
        };
        if let Some(ip) = self.bind_ip {
            socket.bind(SocketAddr::new(ip, 0))?;
        }
        Ok(socket)
    }
}

#[async_trait]
impl FtpConnectionProvider<TcpStream> for LocalConnectionProvider {
    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> io::Result<TcpStream> {
        let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
        for addr in tokio::net::lookup_host(server.to_string()).await? {
            let socket = self.new_socket_to(addr.ip())?;
            match socket.connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    debug!("control connection to {addr} established");
                    self.remote_addr = Some(addr);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("failed to connect to {addr}: {e}");
                    err = e;
                }
            }
        }

        Err(err)
    }

    async fn new_data_connection(&mut self, data_addr: &FtpServerAddr) -> io::Result<TcpStream> {
        match self.remote_addr {
            Some(addr) => {
                // passive replies may carry a private address, only the port is used
                let data_addr = SocketAddr::new(addr.ip(), data_addr.port());
                let socket = self.new_socket_to(data_addr.ip())?;
                socket.connect(data_addr).await
            }
            None => Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved server addr found",
            )),
        }
    }
}
