//! Conformance checking.
//!
//! [`Lint`] sits between two layers and checks both directions of the
//! calling convention: the environment going in, the response coming out,
//! and the streams and body while they are being used. Any violation becomes
//! a [`LintError`].
//!
//! An environment that fails the checks never reaches the wrapped
//! application. Body checks that need the whole body (the declared
//! `Content-Length`, emptiness for `HEAD`) fail while the server iterates
//! the body.

mod body;
mod env;
mod error;
mod errors;
mod input;

use lack_http::handler::Application;
use lack_http::protocol::{keys, BoxError, Env, Headers, Response, ResponseBody, Value};
use tracing::debug;

use crate::utils::ensure;
use crate::wrapper::Wrapper;

use body::BodyProxy;
pub use error::LintError;
use errors::ErrorWrapper;
use input::InputWrapper;

/// Wraps an application with conformance checks.
#[derive(Debug)]
pub struct Lint<A> {
    app: A,
}

/// The [`Wrapper`] installing [`Lint`] around an application.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintWrapper;

impl<A: Application> Lint<A> {
    pub fn new(app: A) -> Self {
        Self { app }
    }
}

impl<A: Application> Wrapper<A> for LintWrapper {
    type Out = Lint<A>;

    fn wrap(&self, app: A) -> Self::Out {
        Lint::new(app)
    }
}

/// Statuses whose responses carry no entity body.
pub(crate) fn forbids_body(status: u16) -> bool {
    (100..200).contains(&status) || matches!(status, 204 | 205 | 304)
}

fn install_streams(env: &mut Env) {
    env.replace_with(keys::LACK_INPUT, |value| match value {
        Value::Input(input) => Value::Input(Box::new(InputWrapper::new(input))),
        other => other,
    });
    env.replace_with(keys::LACK_ERRORS, |value| match value {
        Value::Errors(errors) => Value::Errors(Box::new(ErrorWrapper::new(errors))),
        other => other,
    });
}

fn check_status(status: u16) -> Result<(), LintError> {
    ensure!(status >= 100, LintError::new("Status must be >=100 seen as integer"));
    Ok(())
}

/// Visible ASCII without separators.
fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && !b"(),/:;<=>?@[\\]{}".contains(&b))
}

fn check_headers(headers: &Headers) -> Result<(), LintError> {
    for (name, value) in headers.iter() {
        ensure!(!name.eq_ignore_ascii_case("status"), LintError::new("header must not contain Status"));
        ensure!(!name.contains([':', '\n']), LintError::new("header names must not contain : or \\n"));
        ensure!(!name.ends_with(['-', '_']), LintError::new("header names must not end in - or _"));
        ensure!(is_header_name(name), LintError::new(format!("invalid header name: {name}")));

        for item in value.split('\n') {
            ensure!(
                !item.chars().any(|c| c.is_ascii_control()),
                LintError::new(format!("invalid header value {name}: {item:?}"))
            );
        }
    }
    Ok(())
}

fn check_no_body_headers(status: u16, headers: &Headers) -> Result<(), LintError> {
    if !forbids_body(status) {
        return Ok(());
    }
    for name in ["Content-Type", "Content-Length"] {
        ensure!(
            !headers.contains(name),
            LintError::new(format!("{name} header found in {status} response, not allowed"))
        );
    }
    Ok(())
}

impl<A: Application> Application for Lint<A> {
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        env::check_env(env).inspect_err(|e| debug!(error = %e, "environment rejected"))?;
        install_streams(env);

        let head_request = env.request_method() == "HEAD";
        let (status, headers, body) = self.app.call(env)?.into_parts();

        check_status(status)?;
        check_headers(&headers)?;
        check_no_body_headers(status, &headers).inspect_err(|e| debug!(error = %e, "response rejected"))?;

        let content_length = headers.get(http::header::CONTENT_LENGTH.as_str()).map(str::to_owned);
        let body = BodyProxy::new(body, status, head_request, content_length);
        Ok(Response::from_parts(status, headers, ResponseBody::stream(body)))
    }
}
