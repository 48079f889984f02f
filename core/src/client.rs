//! Client that sends `Request` values through a `Transport`.
//!
//! # Design
//! `Client` holds only its transport and carries no mutable state, so one
//! instance can be cloned or shared across threads freely. The callback
//! methods are the primitive: each invokes its completion exactly once, on
//! whichever thread the transport finishes on. The `*_async` methods wrap
//! the callback form in a oneshot channel and await it.
//!
//! Typed decoding only runs on 2xx responses. Any other status fails with
//! `BadServerResponse` before the body is looked at.

use std::marker::PhantomData;
use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::http::{ResponseMeta, TransportReply};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Transport, TransportResult, UreqTransport};

/// Turns a response body into a typed value.
pub trait Decoder<T>: Send + Sync + 'static {
    fn decode(&self, body: &[u8]) -> Result<T, serde_json::Error>;
}

/// Decodes bodies with `serde_json::from_slice`.
pub struct JsonDecoder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + 'static> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, body: &[u8]) -> Result<T, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Sends requests through a single transport session.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// A client backed by `UreqTransport` configured from `config`.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_transport(UreqTransport::new(&config))
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Send `request` and deliver the outcome to `completion`.
    pub fn send<F>(&self, request: Request, completion: F)
    where
        F: FnOnce(Result<Response, ApiError>) + Send + 'static,
    {
        let id = request.id();
        let transport_request = request.to_transport();
        debug!(
            "request {id}: {} {}",
            transport_request.method, transport_request.url
        );

        self.transport.execute(
            transport_request,
            Box::new(move |result| {
                let outcome = into_response(result);
                match &outcome {
                    Ok(response) => debug!("request {id}: HTTP {}", response.code()),
                    Err(err) => debug!("request {id}: failed: {err}"),
                }
                completion(outcome);
            }),
        );
    }

    pub async fn send_async(&self, request: Request) -> Result<Response, ApiError> {
        suspend(|complete| self.send(request, complete)).await
    }

    /// Send `request` and decode a successful body as JSON into `T`.
    pub fn send_decoding<T, F>(&self, request: Request, completion: F)
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        self.send_decoding_with(request, JsonDecoder::new(), completion);
    }

    /// Like `send_decoding`, with a caller-supplied decoder.
    pub fn send_decoding_with<T, D, F>(&self, request: Request, decoder: D, completion: F)
    where
        D: Decoder<T>,
        F: FnOnce(Result<T, ApiError>) + Send + 'static,
    {
        self.send(request, move |result| {
            completion(result.and_then(|response| decode_response(&response, &decoder)));
        });
    }

    pub async fn send_decoding_async<T>(&self, request: Request) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send_decoding_async_with(request, JsonDecoder::new()).await
    }

    pub async fn send_decoding_async_with<T, D>(&self, request: Request, decoder: D) -> Result<T, ApiError>
    where
        T: Send + 'static,
        D: Decoder<T>,
    {
        suspend(|complete| self.send_decoding_with(request, decoder, complete)).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Classify what the transport reported.
fn into_response(result: TransportResult) -> Result<Response, ApiError> {
    match result.map_err(ApiError::Transport)? {
        TransportReply {
            meta: Some(ResponseMeta::Http(head)),
            body: Some(body),
        } => Ok(Response::from_parts(&head, body)),
        reply => {
            warn!(
                "transport reply cannot be parsed (metadata: {}, body: {})",
                describe_meta(reply.meta.as_ref()),
                if reply.body.is_some() { "present" } else { "missing" }
            );
            Err(ApiError::CannotParseResponse)
        }
    }
}

fn describe_meta(meta: Option<&ResponseMeta>) -> &'static str {
    match meta {
        Some(ResponseMeta::Http(_)) => "http",
        Some(ResponseMeta::Other) => "not http",
        None => "missing",
    }
}

fn decode_response<T, D: Decoder<T>>(response: &Response, decoder: &D) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(ApiError::BadServerResponse {
            code: response.code(),
        });
    }
    Ok(decoder.decode(response.body())?)
}

type Resume<T> = Box<dyn FnOnce(Result<T, ApiError>) + Send + 'static>;

/// Hand `start` a one-shot resume callback and wait for it to fire.
async fn suspend<T, S>(start: S) -> Result<T, ApiError>
where
    T: Send + 'static,
    S: FnOnce(Resume<T>),
{
    let (sender, receiver) = oneshot::channel();
    start(Box::new(move |result| {
        // The receiver is gone only if the awaiting future was dropped.
        let _ = sender.send(result);
    }));
    receiver.await.unwrap_or(Err(ApiError::Abandoned))
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Mutex;

    use http::{HeaderMap, HeaderValue};
    use serde::Deserialize;

    use super::*;
    use crate::http::{HttpHead, Method, TransportRequest};
    use crate::request::RequestOptions;
    use crate::response::Status;
    use crate::transport::Completion;

    /// Answers every request with a canned result and records what it saw.
    struct StubTransport {
        reply: Box<dyn Fn() -> TransportResult + Send + Sync>,
        seen: Arc<Mutex<Vec<TransportRequest>>>,
    }

    impl StubTransport {
        fn new(reply: impl Fn() -> TransportResult + Send + Sync + 'static) -> Self {
            Self {
                reply: Box::new(reply),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn http(status: u16, body: &'static str) -> Self {
            Self::new(move || {
                let mut headers = HeaderMap::new();
                headers.insert("content-type", HeaderValue::from_static("application/json"));
                Ok(TransportReply::http(status, headers, body.as_bytes().to_vec()))
            })
        }
    }

    impl Transport for StubTransport {
        fn execute(&self, request: TransportRequest, completion: Completion) {
            self.seen.lock().unwrap().push(request);
            completion((self.reply)());
        }
    }

    /// Drops every completion without calling it.
    struct SilentTransport;

    impl Transport for SilentTransport {
        fn execute(&self, _request: TransportRequest, _completion: Completion) {}
    }

    #[derive(Debug)]
    struct Offline;

    impl fmt::Display for Offline {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "network is offline")
        }
    }

    impl Error for Offline {}

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    /// Counts how often it is asked to decode.
    struct CountingDecoder {
        calls: Arc<AtomicUsize>,
    }

    impl Decoder<User> for CountingDecoder {
        fn decode(&self, body: &[u8]) -> Result<User, serde_json::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            serde_json::from_slice(body)
        }
    }

    /// Reads the value out of a `{"data": ...}` envelope.
    struct EnvelopeDecoder;

    impl Decoder<User> for EnvelopeDecoder {
        fn decode(&self, body: &[u8]) -> Result<User, serde_json::Error> {
            #[derive(Deserialize)]
            struct Envelope {
                data: User,
            }
            serde_json::from_slice::<Envelope>(body).map(|envelope| envelope.data)
        }
    }

    fn users_request() -> Request {
        Request::from_url(
            Some("https://api.example.com/users?active=true"),
            RequestOptions::default(),
        )
        .unwrap()
    }

    /// Run the callback form and collect every delivered result.
    fn send_collect(client: &Client, request: Request) -> Vec<Result<Response, ApiError>> {
        let (tx, rx) = mpsc::channel();
        client.send(request, move |result| tx.send(result).unwrap());
        rx.iter().collect()
    }

    #[test]
    fn send_builds_response_from_http_reply() {
        let client = Client::with_transport(StubTransport::http(200, r#"{"name":"a"}"#));
        let mut results = send_collect(&client, users_request());

        assert_eq!(results.len(), 1);
        let response = results.pop().unwrap().unwrap();
        assert_eq!(response.code(), 200);
        assert_eq!(response.status(), Status::Success);
        assert_eq!(response.body(), br#"{"name":"a"}"#);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn send_hands_materialized_request_to_transport() {
        let transport = StubTransport::http(200, "{}");
        let seen = Arc::clone(&transport.seen);
        let client = Client::with_transport(transport);

        let mut headers = std::collections::HashMap::new();
        headers.insert("accept".to_string(), "application/json".to_string());
        let request = Request::from_url(
            Some("https://api.example.com/users"),
            RequestOptions {
                method: Method::Post,
                headers,
                body: Some(b"{}".to_vec()),
                ..Default::default()
            },
        )
        .unwrap();
        send_collect(&client, request);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, http::Method::POST);
        assert_eq!(seen[0].url.as_str(), "https://api.example.com/users");
        assert_eq!(seen[0].headers["accept"], "application/json");
        assert_eq!(seen[0].body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn transport_error_is_passed_through() {
        let client = Client::with_transport(StubTransport::new(|| Err(Offline.into())));
        let mut results = send_collect(&client, users_request());

        assert_eq!(results.len(), 1);
        match results.pop().unwrap().unwrap_err() {
            ApiError::Transport(err) => assert!(err.downcast_ref::<Offline>().is_some()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn missing_body_cannot_be_parsed() {
        let client = Client::with_transport(StubTransport::new(|| {
            Ok(TransportReply {
                meta: Some(ResponseMeta::Http(HttpHead {
                    status: 200,
                    headers: HeaderMap::new(),
                })),
                body: None,
            })
        }));
        let results = send_collect(&client, users_request());
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::CannotParseResponse)));
    }

    #[test]
    fn non_http_reply_cannot_be_parsed() {
        let client = Client::with_transport(StubTransport::new(|| {
            Ok(TransportReply {
                meta: Some(ResponseMeta::Other),
                body: Some(b"{}".to_vec()),
            })
        }));
        let results = send_collect(&client, users_request());
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::CannotParseResponse)));
    }

    #[test]
    fn missing_metadata_cannot_be_parsed() {
        let client = Client::with_transport(StubTransport::new(|| {
            Ok(TransportReply {
                meta: None,
                body: Some(Vec::new()),
            })
        }));
        let results = send_collect(&client, users_request());
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::CannotParseResponse)));
    }

    #[test]
    fn send_decoding_decodes_success_body() {
        let client = Client::with_transport(StubTransport::http(200, r#"{"name":"a"}"#));
        let (tx, rx) = mpsc::channel();
        client.send_decoding::<User, _>(users_request(), move |result| tx.send(result).unwrap());

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().name, "a");
    }

    #[test]
    fn send_decoding_skips_decoder_on_non_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = Client::with_transport(StubTransport::http(404, "{}"));
        let (tx, rx) = mpsc::channel();
        client.send_decoding_with(
            users_request(),
            CountingDecoder {
                calls: Arc::clone(&calls),
            },
            move |result| tx.send(result).unwrap(),
        );

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(ApiError::BadServerResponse { code: 404 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn send_decoding_passes_decode_error_through() {
        let client = Client::with_transport(StubTransport::http(200, "not json"));
        let (tx, rx) = mpsc::channel();
        client.send_decoding::<User, _>(users_request(), move |result| tx.send(result).unwrap());

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::Decode(_))));
    }

    #[test]
    fn send_decoding_propagates_send_failure() {
        let client = Client::with_transport(StubTransport::new(|| Err(Offline.into())));
        let (tx, rx) = mpsc::channel();
        client.send_decoding::<User, _>(users_request(), move |result| tx.send(result).unwrap());

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ApiError::Transport(_))));
    }

    #[test]
    fn custom_decoder_is_used() {
        let client = Client::with_transport(StubTransport::http(200, r#"{"data":{"name":"b"}}"#));
        let (tx, rx) = mpsc::channel();
        client.send_decoding_with(users_request(), EnvelopeDecoder, move |result| {
            tx.send(result).unwrap()
        });

        let user = rx.recv().unwrap().unwrap();
        assert_eq!(user, User { name: "b".into() });
    }

    #[tokio::test]
    async fn send_async_resolves_with_response() {
        let client = Client::with_transport(StubTransport::http(500, "{}"));
        let response = client.send_async(users_request()).await.unwrap();
        assert_eq!(response.status(), Status::ServerError);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn send_decoding_async_end_to_end() {
        let client = Client::with_transport(StubTransport::http(200, r#"{"name":"a"}"#));
        let user: User = client.send_decoding_async(users_request()).await.unwrap();
        assert_eq!(user.name, "a");
    }

    #[tokio::test]
    async fn send_decoding_async_fails_on_server_error() {
        let client = Client::with_transport(StubTransport::http(500, r#"{"name":"a"}"#));
        let err = client
            .send_decoding_async::<User>(users_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadServerResponse { code: 500 }));
    }

    #[tokio::test]
    async fn send_decoding_async_with_custom_decoder() {
        let client = Client::with_transport(StubTransport::http(200, r#"{"data":{"name":"c"}}"#));
        let user = client
            .send_decoding_async_with(users_request(), EnvelopeDecoder)
            .await
            .unwrap();
        assert_eq!(user.name, "c");
    }

    #[tokio::test]
    async fn dropped_completion_resolves_as_abandoned() {
        let client = Client::with_transport(SilentTransport);
        let err = client.send_async(users_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Abandoned));
    }

    #[test]
    fn client_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Client>();
        assert_send_sync::<Request>();
        assert_send_sync::<Response>();
    }
}
