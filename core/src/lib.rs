//! Typed HTTP client core.
//!
//! # Overview
//! Builds validated `Request` values, sends them through a pluggable
//! `Transport`, and hands back immutable `Response` values or JSON-decoded
//! models. Results arrive through a callback or an awaitable future.
//!
//! # Design
//! - `Request` and `Response` are immutable values; their constructors
//!   enforce every invariant up front.
//! - `Client` is stateless apart from its transport and can be shared across
//!   threads without locking.
//! - I/O lives behind the `Transport` trait. `UreqTransport` is the default
//!   session; tests substitute their own.
//! - No retries, caching or cancellation. Each `send` is a single attempt.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{Client, Decoder, JsonDecoder};
pub use config::SessionConfig;
pub use error::ApiError;
pub use self::http::{CachePolicy, HttpHead, Method, ResponseMeta, Scheme, TransportReply, TransportRequest};
pub use request::{Request, RequestOptions, UrlComponents, DEFAULT_TIMEOUT};
pub use response::{Response, Status};
pub use transport::{Completion, Transport, TransportError, TransportResult, UreqTransport};
