//! The transport seam and its default ureq-backed session.
//!
//! # Design
//! A `Transport` receives a `TransportRequest` and a single-use completion.
//! It must call the completion exactly once, from whatever thread finishes
//! the exchange. `FnOnce` makes a second call impossible; dropping the
//! completion without calling it is a transport bug that the client surfaces
//! as `ApiError::Abandoned`.
//!
//! `UreqTransport` owns one `ureq::Agent` for its whole life, so connection
//! reuse is whatever ureq provides. Each exchange is blocking and runs on its
//! own named thread. Response bodies are read in full with no size cap.

use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{trace, warn};
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use crate::config::SessionConfig;
use crate::http::{TransportReply, TransportRequest};

/// Opaque failure reported by a transport. Passed to callers untouched.
pub type TransportError = Box<dyn Error + Send + Sync + 'static>;

pub type TransportResult = Result<TransportReply, TransportError>;

/// Callback a transport invokes once the exchange has finished.
pub type Completion = Box<dyn FnOnce(TransportResult) + Send + 'static>;

/// Performs HTTP exchanges on behalf of a `Client`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: TransportRequest, completion: Completion);
}

/// Default session backed by a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    additional_headers: HashMap<String, String>,
}

impl UreqTransport {
    pub fn new(config: &SessionConfig) -> Self {
        // Status codes are data for the client to classify, never errors.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(config.max_redirects)
            .timeout_connect(config.connect_timeout)
            .build()
            .new_agent();

        Self {
            agent,
            additional_headers: config.additional_headers.clone(),
        }
    }

    fn perform(&self, request: &TransportRequest) -> TransportResult {
        let uri = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method.as_str() {
            "CONNECT" => send_without_body(self.prepare(self.agent.connect(uri), request), body),
            "DELETE" => send_without_body(self.prepare(self.agent.delete(uri), request), body),
            "GET" => send_without_body(self.prepare(self.agent.get(uri), request), body),
            "HEAD" => send_without_body(self.prepare(self.agent.head(uri), request), body),
            "OPTIONS" => send_without_body(self.prepare(self.agent.options(uri), request), body),
            "TRACE" => send_without_body(self.prepare(self.agent.trace(uri), request), body),
            "PATCH" => send_with_body(self.prepare(self.agent.patch(uri), request), body),
            "POST" => send_with_body(self.prepare(self.agent.post(uri), request), body),
            "PUT" => send_with_body(self.prepare(self.agent.put(uri), request), body),
            other => return Err(format!("unsupported HTTP method: {other}").into()),
        };

        let mut response = result?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.body_mut().with_config().limit(u64::MAX).read_to_vec()?;

        Ok(TransportReply::http(status, headers, body))
    }

    /// Apply session headers, request headers and the request timeout.
    fn prepare<B>(&self, mut builder: RequestBuilder<B>, request: &TransportRequest) -> RequestBuilder<B> {
        for (name, value) in &self.additional_headers {
            let overridden = request
                .headers
                .keys()
                .any(|key| key.eq_ignore_ascii_case(name));
            if !overridden {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder.config().timeout_global(Some(request.timeout)).build()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: TransportRequest, completion: Completion) {
        let transport = self.clone();
        let work = move || {
            trace!("{} {} on transport thread", request.method, request.url);
            transport.perform(&request)
        };
        dispatch(spawn_named, work, completion);
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

fn spawn_named(job: Job) -> io::Result<()> {
    thread::Builder::new()
        .name("courier-transport".to_string())
        .spawn(job)
        .map(drop)
}

/// Run `work` through `spawn` and hand its result to `completion`. If the
/// job cannot be started, `completion` receives the spawn error instead.
fn dispatch<S, W>(spawn: S, work: W, completion: Completion)
where
    S: FnOnce(Job) -> io::Result<()>,
    W: FnOnce() -> TransportResult + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Some(completion)));
    let worker_slot = Arc::clone(&slot);
    let job: Job = Box::new(move || {
        let result = work();
        if let Some(completion) = take(&worker_slot) {
            completion(result);
        }
    });

    if let Err(err) = spawn(job) {
        warn!("cannot start transport thread: {err}");
        if let Some(completion) = take(&slot) {
            completion(Err(err.into()));
        }
    }
}

fn take(slot: &Mutex<Option<Completion>>) -> Option<Completion> {
    slot.lock().ok().and_then(|mut completion| completion.take())
}

type UreqResult = Result<http::Response<Body>, ureq::Error>;

fn send_without_body(builder: RequestBuilder<WithoutBody>, body: Option<&[u8]>) -> UreqResult {
    match body {
        Some(bytes) => builder.force_send_body().send(bytes),
        None => builder.call(),
    }
}

fn send_with_body(builder: RequestBuilder<WithBody>, body: Option<&[u8]>) -> UreqResult {
    match body {
        Some(bytes) => builder.send(bytes),
        None => builder.send_empty(),
    }
}
