use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::Attachment;
use crate::transport::charset::decode_body;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    /// Pre-encoded body sent with its own content type.
    Raw {
        content_type: String,
        bytes: Vec<u8>,
    },
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<Attachment>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body,
        }
    }

    pub fn post_form(url: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self::post(url, RequestBody::Form(params))
    }

    /// Form fields of the request, if it carries any.
    #[cfg(test)]
    pub fn form_params(&self) -> &[(String, String)] {
        match &self.body {
            RequestBody::Form(params) => params,
            RequestBody::Multipart { fields, .. } => fields,
            RequestBody::Empty | RequestBody::Raw { .. } => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpError {
    /// The host could not be reached (connect failure or timeout).
    #[error("host unavailable: {0}")]
    Unavailable(#[source] BoxError),

    #[error("{0}")]
    Other(#[source] BoxError),

    #[error("request cancelled")]
    Cancelled,
}

pub(crate) trait HttpTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>>;
}

/// Run `request`, aborting it as soon as `cancel` fires.
pub(crate) async fn execute_cancellable(
    http: &dyn HttpTransport,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpResponse, HttpError> {
    if cancel.is_cancelled() {
        return Err(HttpError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HttpError::Cancelled),
        response = http.execute(request) => response,
    }
}

/// Build a `reqwest` client with a timeout and an optional `User-Agent`.
pub fn build_http_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, crate::SmsError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    builder
        .build()
        .map_err(|err| crate::SmsError::Transport(Box::new(err)))
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
        Box::pin(async move {
            let builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
            };
            let builder = match request.body {
                RequestBody::Empty => builder,
                RequestBody::Form(params) => builder.form(&params),
                RequestBody::Raw {
                    content_type,
                    bytes,
                } => builder
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes),
                RequestBody::Multipart { fields, files } => {
                    let mut form = reqwest::multipart::Form::new();
                    for (name, value) in fields {
                        form = form.text(name, value);
                    }
                    for (idx, file) in files.into_iter().enumerate() {
                        let part = reqwest::multipart::Part::bytes(file.content().to_vec())
                            .file_name(file.file_name().to_owned());
                        form = form.part(format!("file{idx}"), part);
                    }
                    builder.multipart(form)
                }
            };

            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let bytes = response.bytes().await.map_err(classify)?;
            Ok(HttpResponse {
                status,
                body: decode_body(&bytes, content_type.as_deref()),
            })
        })
    }
}

fn classify(err: reqwest::Error) -> HttpError {
    if err.is_connect() || err.is_timeout() {
        HttpError::Unavailable(Box::new(err))
    } else {
        HttpError::Other(Box::new(err))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug)]
    pub enum FakeReply {
        Response { status: u16, body: String },
        Unavailable,
        Failure,
    }

    #[derive(Debug, Default)]
    struct FakeTransportState {
        requests: Vec<HttpRequest>,
        replies: VecDeque<FakeReply>,
    }

    /// Records every request and answers with queued replies (`200 ""` once drained).
    #[derive(Debug, Clone, Default)]
    pub struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
            self.push(FakeReply::Response {
                status,
                body: body.into(),
            })
        }

        pub fn unavailable(self) -> Self {
            self.push(FakeReply::Unavailable)
        }

        pub fn failure(self) -> Self {
            self.push(FakeReply::Failure)
        }

        fn push(self, reply: FakeReply) -> Self {
            self.state.lock().unwrap().replies.push_back(reply);
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub fn last_request(&self) -> HttpRequest {
            self.requests().pop().expect("no request recorded")
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|it| it.url).collect()
        }
    }

    impl HttpTransport for FakeTransport {
        fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
            Box::pin(async move {
                let reply = {
                    let mut state = self.state.lock().unwrap();
                    state.requests.push(request);
                    state.replies.pop_front()
                };
                match reply {
                    Some(FakeReply::Response { status, body }) => Ok(HttpResponse { status, body }),
                    Some(FakeReply::Unavailable) => {
                        Err(HttpError::Unavailable("connection refused".into()))
                    }
                    Some(FakeReply::Failure) => Err(HttpError::Other("broken pipe".into())),
                    None => Ok(HttpResponse {
                        status: 200,
                        body: String::new(),
                    }),
                }
            })
        }
    }

    pub fn assert_param(params: &[(String, String)], key: &str, value: &str) {
        assert!(
            params.iter().any(|(k, v)| k == key && v == value),
            "missing param {key}={value}; got: {params:?}"
        );
    }

    pub fn assert_no_param(params: &[(String, String)], key: &str) {
        assert!(
            params.iter().all(|(k, _)| k != key),
            "unexpected param {key}; got: {params:?}"
        );
    }
}
