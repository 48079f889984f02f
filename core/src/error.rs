//! Error types for the courier client.
//!
//! # Design
//! Every failure is terminal for the call that produced it. Transport and
//! JSON decoding errors are carried through untouched so callers can
//! downcast or inspect them; the remaining variants describe the few
//! conditions this crate checks itself.

use crate::transport::TransportError;

/// Errors returned while building requests or sending them through a
/// `Client`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The URL was absent, malformed, or could not be assembled from its
    /// components.
    #[error("invalid URL")]
    InvalidUrl,

    /// The URL scheme is neither `http` nor `https`.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The transport failed before producing a response.
    #[error(transparent)]
    Transport(TransportError),

    /// The transport finished without an HTTP response or without a body.
    #[error("cannot parse response")]
    CannotParseResponse,

    /// A typed decode was requested but the status code is not 2xx.
    #[error("bad server response: HTTP {code}")]
    BadServerResponse { code: u16 },

    /// The response body could not be decoded into the requested type.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    /// The transport dropped its completion without invoking it.
    #[error("transport abandoned the request without completing it")]
    Abandoned,
}
