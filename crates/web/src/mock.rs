//! Requests without a server.
//!
//! [`MockRequest`] builds a valid environment from a URI, calls an
//! application with it and collects the whole response into a
//! [`MockResponse`]. Useful in tests and benchmarks.
//!
//! ```
//! use lack_http::handler::app_fn;
//! use lack_http::protocol::{Env, Response};
//! use lack_web::mock::MockRequest;
//!
//! let app = app_fn(|env: &mut Env| Ok(Response::text(200, env.path_info().to_owned())));
//! let response = MockRequest::new(app).get("/hello?x=1").unwrap();
//!
//! assert!(response.is_ok());
//! assert_eq!(response.body(), "/hello");
//! ```

use std::borrow::Cow;

use bytes::Bytes;
use http::uri::InvalidUri;
use http::{Method, Uri};
use lack_http::handler::Application;
use lack_http::protocol::{keys, Body, BoxError, Env, ErrorBuffer, Headers, Response, StringInput, Value};
use thiserror::Error;
use tracing::trace;

use crate::lint::Lint;

pub const DEFAULT_HOST: &str = "example.org";

#[derive(Error, Debug)]
pub enum MockError {
    #[error("invalid request uri: {source}")]
    InvalidUri {
        #[from]
        source: InvalidUri,
    },

    #[error("params could not be encoded: {source}")]
    Params {
        #[from]
        source: serde_urlencoded::ser::Error,
    },
}

/// How to shape a mock request beyond its URI.
#[derive(Debug, Default)]
pub struct MockOptions {
    method: Option<Method>,
    input: Option<Bytes>,
    params: Vec<(String, String)>,
    lint: bool,
    env: Vec<(String, Value)>,
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Request body.
    #[must_use]
    pub fn input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// A parameter, sent in the query string for `GET` and `HEAD` and as a
    /// form body otherwise.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Runs the application behind [`Lint`].
    #[must_use]
    pub fn lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    /// An extra environment entry, overriding the generated one.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug)]
pub struct MockRequest<A> {
    app: A,
}

impl MockRequest<()> {
    /// The environment a request to `uri` would carry.
    pub fn env_for(uri: &str, options: MockOptions) -> Result<Env, MockError> {
        build_env(uri, options).map(|(env, _)| env)
    }
}

fn build_env(uri: &str, options: MockOptions) -> Result<(Env, ErrorBuffer), MockError> {
    let uri: Uri = if uri.is_empty() { Uri::from_static("/") } else { uri.parse()? };
    let method = options.method.unwrap_or(Method::GET);

    let scheme = uri.scheme_str().unwrap_or("http");
    let default_port = if scheme == "https" { 443 } else { 80 };
    let path = match uri.path() {
        "" => "/",
        path => path,
    };

    let mut query = Cow::Borrowed(uri.query().unwrap_or_default());
    let mut input = options.input;
    let mut content_type = None;
    if !options.params.is_empty() {
        let encoded = serde_urlencoded::to_string(&options.params)?;
        if method == Method::GET || method == Method::HEAD {
            query = if query.is_empty() { Cow::Owned(encoded) } else { Cow::Owned(format!("{query}&{encoded}")) };
        } else if input.is_none() {
            input = Some(Bytes::from(encoded));
            content_type = Some(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref());
        }
    }
    let input = input.unwrap_or_default();
    let errors = ErrorBuffer::new();

    let mut env = Env::new();
    env.set(keys::REQUEST_METHOD, method.as_str());
    env.set(keys::SERVER_NAME, uri.host().unwrap_or(DEFAULT_HOST));
    env.set(keys::SERVER_PORT, uri.port_u16().unwrap_or(default_port).to_string());
    env.set(keys::QUERY_STRING, query.into_owned());
    env.set(keys::SCRIPT_NAME, "");
    env.set(keys::PATH_INFO, path);
    env.set(keys::LACK_URL_SCHEME, scheme);
    env.set(keys::LACK_VERSION, keys::VERSION);
    env.set(keys::LACK_MULTITHREAD, true);
    env.set(keys::LACK_MULTIPROCESS, true);
    env.set(keys::LACK_RUN_ONCE, false);
    env.set(keys::CONTENT_LENGTH, input.len().to_string());
    if let Some(content_type) = content_type {
        env.set(keys::CONTENT_TYPE, content_type);
    }
    env.set(keys::LACK_INPUT, Value::Input(Box::new(StringInput::new(input))));
    env.set(keys::LACK_ERRORS, Value::Errors(Box::new(errors.clone())));
    env.extend(options.env);

    Ok((env, errors))
}

impl<A: Application> MockRequest<A> {
    pub fn new(app: A) -> Self {
        Self { app }
    }

    pub fn get(&self, uri: &str) -> Result<MockResponse, BoxError> {
        self.request(Method::GET, uri, MockOptions::new())
    }

    pub fn post(&self, uri: &str, options: MockOptions) -> Result<MockResponse, BoxError> {
        self.request(Method::POST, uri, options)
    }

    pub fn put(&self, uri: &str, options: MockOptions) -> Result<MockResponse, BoxError> {
        self.request(Method::PUT, uri, options)
    }

    pub fn patch(&self, uri: &str, options: MockOptions) -> Result<MockResponse, BoxError> {
        self.request(Method::PATCH, uri, options)
    }

    pub fn delete(&self, uri: &str) -> Result<MockResponse, BoxError> {
        self.request(Method::DELETE, uri, MockOptions::new())
    }

    pub fn head(&self, uri: &str) -> Result<MockResponse, BoxError> {
        self.request(Method::HEAD, uri, MockOptions::new())
    }

    /// Calls the application and drains the response. Errors raised by the
    /// application or while reading the body are returned as they are.
    pub fn request(&self, method: Method, uri: &str, options: MockOptions) -> Result<MockResponse, BoxError> {
        let lint = options.lint;
        let (mut env, errors) = build_env(uri, options.method(method))?;
        trace!(method = env.request_method(), path = env.path_info(), lint, "mock request");

        let response = if lint { Lint::new(&self.app).call(&mut env)? } else { self.app.call(&mut env)? };
        MockResponse::collect(response, &errors)
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Headers,
    body: Bytes,
    errors: String,
}

impl MockResponse {
    fn collect(response: Response, errors: &ErrorBuffer) -> Result<Self, BoxError> {
        let (status, headers, mut body) = response.into_parts();
        let bytes = body.collect_bytes();
        let closed = body.close();
        let body = bytes?;
        closed?;

        Ok(Self { status, headers, body, errors: errors.contents() })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The body as text, invalid UTF-8 replaced.
    pub fn body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// What the application wrote to `lack.errors`.
    pub fn errors(&self) -> &str {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

#[cfg(test)]
mod tests {
    use super::{MockOptions, MockRequest};
    use crate::lint::LintError;
    use bytes::Bytes;
    use http::Method;
    use lack_http::handler::app_fn;
    use lack_http::protocol::{keys, Env, Response};

    #[test]
    fn test_env_defaults() {
        let env = MockRequest::env_for("", MockOptions::new()).unwrap();

        assert_eq!(env.request_method(), "GET");
        assert_eq!(env.get_str(keys::SERVER_NAME), Some("example.org"));
        assert_eq!(env.get_str(keys::SERVER_PORT), Some("80"));
        assert_eq!(env.get_str(keys::QUERY_STRING), Some(""));
        assert_eq!(env.get_str(keys::CONTENT_LENGTH), Some("0"));
        assert_eq!(env.get_str(keys::LACK_URL_SCHEME), Some("http"));
        assert_eq!(env.script_name(), "");
        assert_eq!(env.path_info(), "/");
    }

    #[test]
    fn test_env_from_uri() {
        let env = MockRequest::env_for("https://bla.example.org:9292/meh/foo?bar", MockOptions::new()).unwrap();

        assert_eq!(env.get_str(keys::SERVER_NAME), Some("bla.example.org"));
        assert_eq!(env.get_str(keys::SERVER_PORT), Some("9292"));
        assert_eq!(env.get_str(keys::QUERY_STRING), Some("bar"));
        assert_eq!(env.path_info(), "/meh/foo");
        assert_eq!(env.get_str(keys::LACK_URL_SCHEME), Some("https"));

        let env = MockRequest::env_for("https://example.org/", MockOptions::new()).unwrap();
        assert_eq!(env.get_str(keys::SERVER_PORT), Some("443"));
    }

    #[test]
    fn test_params() {
        let options = MockOptions::new().param("foo", "bar baz").param("n", "1");
        let env = MockRequest::env_for("/?a=b", options).unwrap();
        assert_eq!(env.get_str(keys::QUERY_STRING), Some("a=b&foo=bar+baz&n=1"));

        let options = MockOptions::new().method(Method::POST).param("foo", "bar");
        let mut env = MockRequest::env_for("/", options).unwrap();
        assert_eq!(env.get_str(keys::CONTENT_TYPE), Some("application/x-www-form-urlencoded"));
        assert_eq!(env.get_str(keys::CONTENT_LENGTH), Some("7"));
        let body = env.input_mut().unwrap().read(None, None).unwrap();
        assert_eq!(body, Some(Bytes::from("foo=bar")));
    }

    #[test]
    fn test_extra_env_overrides() {
        let options = MockOptions::new().env(keys::HTTP_HOST, "foo.org").env(keys::SERVER_NAME, "foo.org");
        let env = MockRequest::env_for("/", options).unwrap();
        assert_eq!(env.get_str(keys::HTTP_HOST), Some("foo.org"));
        assert_eq!(env.get_str(keys::SERVER_NAME), Some("foo.org"));
    }

    #[test]
    fn test_request_collects_response() {
        let app = app_fn(|env: &mut Env| {
            if let Some(errors) = env.errors_mut() {
                errors.puts("noted")?;
            }
            let input = env.input_mut().map(|input| input.read(None, None)).transpose()?.flatten().unwrap_or_default();
            Ok(Response::text(201, String::from_utf8_lossy(&input).into_owned()))
        });

        let response = MockRequest::new(app).post("/", MockOptions::new().input("posted").lint(true)).unwrap();
        assert_eq!(response.status(), 201);
        assert!(response.is_successful());
        assert!(!response.is_ok());
        assert_eq!(response.body(), "posted");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.errors(), "noted\n");
    }

    #[test]
    fn test_lint_errors_surface() {
        let app = app_fn(|_env: &mut Env| Ok(Response::text(200, "body").with_header("Content-Length", "1")));

        let err = MockRequest::new(&app).request(Method::GET, "/", MockOptions::new().lint(true)).unwrap_err();
        let lint = LintError::from_box(err.as_ref()).unwrap();
        assert_eq!(lint.message(), "Content-Length header was 1, but should be 4");

        let response = MockRequest::new(&app).get("/").unwrap();
        assert_eq!(response.body(), "body");
    }

    #[test]
    fn test_predicates() {
        let respond = |status: u16| {
            let app = app_fn(move |_env: &mut Env| Ok(Response::new(status)));
            MockRequest::new(app).get("/").unwrap()
        };

        assert!(respond(404).is_not_found());
        assert!(respond(404).is_client_error());
        assert!(respond(503).is_server_error());
        assert!(respond(302).is_redirect());
        assert!(respond(200).is_ok());
    }
}
