//! HTTP vocabulary and transport-level data.
//!
//! # Design
//! The enums here are the typed vocabulary of `Request`. The `Transport*`
//! structs describe what crosses the transport seam as plain data: a
//! `Request` is materialized into a `TransportRequest`, and the transport
//! answers with a `TransportReply` that the client classifies. Nothing in
//! this module performs I/O.

use std::collections::HashMap;
use std::time::Duration;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// URL scheme accepted by `Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Match a lowercase scheme name. Anything other than `http` or `https`
    /// yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }
}

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Connect,
    Delete,
    #[default]
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Lowercase method name, e.g. `"get"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Connect => "connect",
            Method::Delete => "delete",
            Method::Get => "get",
            Method::Head => "head",
            Method::Options => "options",
            Method::Patch => "patch",
            Method::Post => "post",
            Method::Put => "put",
            Method::Trace => "trace",
        }
    }

    /// The wire form of the method, always uppercase.
    pub fn as_http(self) -> http::Method {
        match self {
            Method::Connect => http::Method::CONNECT,
            Method::Delete => http::Method::DELETE,
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Patch => http::Method::PATCH,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Trace => http::Method::TRACE,
        }
    }
}

/// Cache hint handed to the transport. This crate never interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    UseProtocolCachePolicy,
    ReloadIgnoringLocalCacheData,
    ReloadIgnoringLocalAndRemoteCacheData,
    #[default]
    ReturnCacheDataElseLoad,
    ReturnCacheDataDontLoad,
    ReloadRevalidatingCacheData,
}

/// A request as the transport sees it.
///
/// Produced by `Request::to_transport`. Headers and body are carried
/// verbatim; the method is already in its uppercase wire form.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: Url,
    pub method: http::Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub cache_policy: CachePolicy,
    pub timeout: Duration,
}

/// Status line and headers of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpHead {
    pub status: u16,
    pub headers: HeaderMap,
}

/// Response description reported by a transport.
#[derive(Debug, Clone)]
pub enum ResponseMeta {
    Http(HttpHead),
    /// The transport produced a response that is not HTTP-shaped.
    Other,
}

/// Everything a transport reports for an exchange that did not error.
///
/// Either field may be missing; the client treats a reply without HTTP
/// metadata or without a body as unparseable.
#[derive(Debug, Clone, Default)]
pub struct TransportReply {
    pub meta: Option<ResponseMeta>,
    pub body: Option<Vec<u8>>,
}

impl TransportReply {
    /// A well-formed HTTP reply.
    pub fn http(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            meta: Some(ResponseMeta::Http(HttpHead { status, headers })),
            body: Some(body),
        }
    }
}
