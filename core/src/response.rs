//! Immutable HTTP response and its status classification.

use std::borrow::Cow;
use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::HttpHead;

/// Coarse category of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Invalid,
    Information,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl Status {
    pub fn from_code(code: u16) -> Self {
        match code {
            100..=199 => Status::Information,
            200..=299 => Status::Success,
            300..=399 => Status::Redirection,
            400..=499 => Status::ClientError,
            500..=599 => Status::ServerError,
            _ => Status::Invalid,
        }
    }
}

/// A completed HTTP response. The body is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    id: Uuid,
    code: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// Repeated headers are joined with `", "` in arrival order. Values
    /// that are not plain visible-ASCII strings are dropped.
    pub(crate) fn from_parts(head: &HttpHead, body: Vec<u8>) -> Self {
        let mut headers = HashMap::with_capacity(head.headers.keys_len());
        for name in head.headers.keys() {
            let values: Vec<&str> = head
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| match value.to_str() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        trace!("dropping non-string value of header {name}");
                        None
                    }
                })
                .collect();
            if !values.is_empty() {
                headers.insert(name.as_str().to_string(), values.join(", "));
            }
        }

        Self {
            id: Uuid::new_v4(),
            code: head.status,
            headers,
            body,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.code)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }
}
