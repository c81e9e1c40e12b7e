// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin client over the daemon's Unix socket: one request per line in,
//! one response per line out, newline-delimited JSON.

use foreman_wire::{Request, Response};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::error::ClientError;

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|source| ClientError::Connect { path: socket_path.to_path_buf(), source })?;
        Ok(Self { stream })
    }

    /// Send a request and return whatever response the daemon sent back,
    /// errors included -- callers decide whether the shape they got is
    /// the one they expected.
    pub async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stream.write_all(line.as_bytes()).await?;

        let (read_half, _) = self.stream.split();
        let mut reader = BufReader::new(read_half);
        let mut response_line = String::new();
        let bytes_read = reader.read_line(&mut response_line).await?;
        if bytes_read == 0 {
            return Err(ClientError::Disconnected);
        }
        Ok(serde_json::from_str::<Response>(&response_line)?)
    }

    /// Send a request expecting nothing but acknowledgement.
    pub async fn send_simple(&mut self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(ClientError::Rejected(e)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Send `Subscribe` and hand every event the daemon streams back to
    /// `on_event` until the connection closes. `worker_id` + `since_seq`
    /// resume an output stream across a reconnect without gaps.
    pub async fn watch(
        &mut self,
        project: Option<String>,
        worker_id: Option<foreman_core::WorkerId>,
        since_seq: Option<u64>,
        mut on_event: impl FnMut(foreman_core::Event),
    ) -> Result<(), ClientError> {
        let mut line = serde_json::to_string(&Request::Subscribe { project, worker_id, since_seq })?;
        line.push('\n');
        self.stream.write_all(line.as_bytes()).await?;

        let (read_half, _) = self.stream.split();
        let mut reader = BufReader::new(read_half);
        let mut buf = String::new();
        loop {
            buf.clear();
            if reader.read_line(&mut buf).await? == 0 {
                return Ok(());
            }
            match serde_json::from_str::<Response>(&buf)? {
                Response::Event(event) => on_event(event),
                Response::Error(e) => return Err(ClientError::Rejected(e)),
                _ => {}
            }
        }
    }

    pub fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error(e) => Err(ClientError::Rejected(e)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

pub fn default_socket_path() -> PathBuf {
    if let Ok(v) = std::env::var("FOREMAN_STATE_DIR") {
        return PathBuf::from(v).join("foremand.sock");
    }
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("foreman").join("foremand.sock")
}
