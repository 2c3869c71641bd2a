//! The lack calling convention.
//!
//! Every lack application, middleware included, is a value with a single
//! method: it takes the request [`Env`](protocol::Env) and returns a
//! [`Response`](protocol::Response). Middleware composes by wrapping an inner
//! application and forwarding to it, so a whole stack is itself one
//! application.
//!
//! # Example
//!
//! ```
//! use lack_http::handler::{app_fn, Application};
//! use lack_http::protocol::{keys, Env, Response};
//!
//! let app = app_fn(|env: &mut Env| {
//!     let body = format!("you asked for {}", env.path_info());
//!     Ok(Response::text(200, body))
//! });
//!
//! let mut env = Env::new();
//! env.set(keys::PATH_INFO, "/hello");
//! let response = app.call(&mut env).unwrap();
//! assert_eq!(response.status(), 200);
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: the environment, stream capabilities and response types
//! - [`handler`]: the [`Application`](handler::Application) trait and its
//!   closure adapter
//!
//! # The environment
//!
//! The environment is created once per request by whatever adapts a server
//! to this convention. It carries CGI-style string keys (`REQUEST_METHOD`,
//! `SCRIPT_NAME`, `PATH_INFO`, ...) and typed `lack.*` keys: the input
//! stream, the error stream, the convention version and a few flags. Dotted
//! keys outside `lack.` are free for extensions.
//!
//! Middleware mutates the environment in place. Sub-applications see the
//! same map, so changes made deep in the stack are visible to the layers
//! above once the call returns.
//!
//! # The response
//!
//! A response is a status, a case-insensitive ordered header map and a body
//! producing byte chunks on demand. The server closes the body once it has
//! written it.

pub mod handler;
pub mod protocol;
