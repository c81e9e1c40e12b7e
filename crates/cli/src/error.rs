// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use foreman_wire::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not reach foremand at {path}: {source}")]
    Connect { path: std::path::PathBuf, source: std::io::Error },

    #[error("lost connection to foremand: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response from foremand: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("daemon connection closed without a response")]
    Disconnected,

    #[error("{:?}: {}", .0.code, .0.message)]
    Rejected(ErrorResponse),

    #[error("unexpected response for this request")]
    UnexpectedResponse,
}
