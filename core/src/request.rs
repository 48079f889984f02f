//! Validated, immutable HTTP request.
//!
//! # Design
//! A `Request` is built once, either from a complete URL or from
//! scheme/host/path/parameters, and never changes afterwards. Both paths
//! store the canonical forms the URL parser produces, so reading `scheme`,
//! `host`, `path` and `parameters` always agrees with re-parsing `url`.
//!
//! Query items are plain percent-encoded: `+` is a literal plus, never a
//! space. Items without an `=` carry no value and are skipped; when a key
//! repeats, the last value wins.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{CachePolicy, Method, Scheme, TransportRequest};

/// Bytes escaped in query names and values. Covers the query delimiters,
/// `+` and `%` so that decoding gives back exactly what was encoded.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>');

/// Default transport timeout for a request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything about a request other than its target.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Identifier to use; a random one is assigned when `None`.
    pub id: Option<Uuid>,
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub cache_policy: CachePolicy,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            id: None,
            method: Method::Get,
            headers: HashMap::new(),
            body: None,
            cache_policy: CachePolicy::ReturnCacheDataElseLoad,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The pieces a URL is assembled from by `Request::from_components`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    pub scheme: Scheme,
    pub host: String,
    pub path: String,
    pub parameters: BTreeMap<String, String>,
}

impl UrlComponents {
    /// `https://{host}/` with no query.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Https,
            host: host.into(),
            path: "/".to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// An HTTP request with a resolved absolute `http` or `https` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: Uuid,
    url: Url,
    scheme: Scheme,
    host: String,
    path: String,
    parameters: BTreeMap<String, String>,
    method: Method,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    cache_policy: CachePolicy,
    timeout: Duration,
}

impl Request {
    /// Build a request targeting a complete URL.
    ///
    /// Fails with `InvalidUrl` when `url` is absent, does not parse or has no
    /// host, and with `UnsupportedScheme` when the scheme is not http(s).
    pub fn from_url(url: Option<&str>, options: RequestOptions) -> Result<Self, ApiError> {
        let raw = url.ok_or(ApiError::InvalidUrl)?;
        let url = Url::parse(raw).map_err(|_| ApiError::InvalidUrl)?;
        let scheme = Scheme::parse(url.scheme())
            .ok_or_else(|| ApiError::UnsupportedScheme(url.scheme().to_string()))?;
        let host = url.host_str().ok_or(ApiError::InvalidUrl)?.to_string();

        Ok(Self::assemble(scheme, host, url, options))
    }

    /// Build a request from its URL components.
    ///
    /// `path` gains a leading `/` if it lacks one. An empty parameter map
    /// produces a URL without any query string.
    pub fn from_components(components: UrlComponents, options: RequestOptions) -> Result<Self, ApiError> {
        let UrlComponents {
            scheme,
            host,
            path,
            parameters,
        } = components;

        let mut url = Url::parse(&format!("{}://localhost/", scheme.as_str()))
            .map_err(|_| ApiError::InvalidUrl)?;
        url.set_host(Some(&host)).map_err(|_| ApiError::InvalidUrl)?;
        url.set_path(&normalize_path(&path));
        if !parameters.is_empty() {
            url.set_query(Some(&encode_query(&parameters)));
        }

        let host = url.host_str().ok_or(ApiError::InvalidUrl)?.to_string();
        Ok(Self::assemble(scheme, host, url, options))
    }

    fn assemble(scheme: Scheme, host: String, url: Url, options: RequestOptions) -> Self {
        Self {
            id: options.id.unwrap_or_else(Uuid::new_v4),
            scheme,
            host,
            path: url.path().to_string(),
            parameters: query_parameters(&url),
            url,
            method: options.method,
            headers: options.headers,
            body: options.body,
            cache_policy: options.cache_policy,
            timeout: options.timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The transport-level form of this request. Pure; may be called any
    /// number of times.
    pub fn to_transport(&self) -> TransportRequest {
        TransportRequest {
            url: self.url.clone(),
            method: self.method.as_http(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            cache_policy: self.cache_policy,
            timeout: self.timeout,
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn encode_query(parameters: &BTreeMap<String, String>) -> String {
    parameters
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Query items of `url` that carry a value.
pub(crate) fn query_parameters(url: &Url) -> BTreeMap<String, String> {
    let Some(query) = url.query() else {
        return BTreeMap::new();
    };
    query
        .split('&')
        .filter_map(|item| item.split_once('='))
        .map(|(name, value)| (decode_component(name), decode_component(value)))
        .collect()
}
