//! Turns application errors into `500` responses.

use lack_http::handler::Application;
use lack_http::protocol::{BoxError, Env, Response, ResponseBody};
use tracing::error;

use crate::wrapper::Wrapper;

/// Catches errors raised below it and answers `500 Internal Server Error`
/// with the error text, reporting the error on `lack.errors` as well.
#[derive(Debug)]
pub struct ShowExceptions<A> {
    app: A,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShowExceptionsWrapper;

impl<A: Application> ShowExceptions<A> {
    pub fn new(app: A) -> Self {
        Self { app }
    }
}

impl<A: Application> Wrapper<A> for ShowExceptionsWrapper {
    type Out = ShowExceptions<A>;

    fn wrap(&self, app: A) -> Self::Out {
        ShowExceptions::new(app)
    }
}

impl<A: Application> Application for ShowExceptions<A> {
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        let err = match self.app.call(env) {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        error!(cause = %err, method = env.request_method(), path = env.path_info(), "application error");
        let report = format!("{}: {err}", env_path(env));
        if let Some(errors) = env.errors_mut() {
            errors.puts(&report)?;
        }

        let mut response = Response::text(500, format!("Internal Server Error\n\n{err}\n"));
        if env.request_method() == "HEAD" {
            response.replace_body(ResponseBody::empty());
        }
        Ok(response)
    }
}

fn env_path(env: &Env) -> String {
    format!("{}{}", env.script_name(), env.path_info())
}

#[cfg(test)]
mod tests {
    use super::{ShowExceptions, ShowExceptionsWrapper};
    use crate::Builder;
    use lack_http::handler::{app_fn, Application};
    use lack_http::protocol::{keys, Env, ErrorBuffer, Response, Value};

    fn env(method: &str, errors: &ErrorBuffer) -> Env {
        let mut env = Env::new();
        env.set(keys::REQUEST_METHOD, method);
        env.set(keys::PATH_INFO, "/boom");
        env.set(keys::LACK_ERRORS, Value::Errors(Box::new(errors.clone())));
        env
    }

    #[test]
    fn test_error_becomes_500() {
        let errors = ErrorBuffer::new();
        let app = ShowExceptions::new(app_fn(|_env: &mut Env| Err("kaboom".into())));

        let mut response = app.call(&mut env("GET", &errors)).unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.headers().get("Content-Type"), Some("text/plain"));

        let body = response.body_mut().collect_bytes().unwrap();
        assert!(String::from_utf8_lossy(&body).contains("kaboom"));
        assert_eq!(errors.contents(), "/boom: kaboom\n");
    }

    #[test]
    fn test_head_has_no_body() {
        let errors = ErrorBuffer::new();
        let app = ShowExceptions::new(app_fn(|_env: &mut Env| Err("kaboom".into())));

        let mut response = app.call(&mut env("HEAD", &errors)).unwrap();
        assert_eq!(response.status(), 500);
        assert!(response.body_mut().collect_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_wrapper_in_builder() {
        let errors = ErrorBuffer::new();
        let app = Builder::app(|b| {
            b.use_middleware(ShowExceptionsWrapper);
            b.run(app_fn(|_env: &mut Env| Err("kaboom".into())));
        })
        .unwrap();

        assert_eq!(app.call(&mut env("GET", &errors)).unwrap().status(), 500);
        assert_eq!(errors.contents(), "/boom: kaboom\n");
    }

    #[test]
    fn test_success_untouched() {
        let app = ShowExceptions::new(app_fn(|_env: &mut Env| Ok(Response::text(200, "fine"))));
        let response = app.call(&mut env("GET", &ErrorBuffer::new())).unwrap();
        assert_eq!(response.status(), 200);
    }
}
