//! Composing lack applications.
//!
//! Built on the calling convention of [`lack_http`], this crate provides
//! what turns single applications into a served stack:
//!
//! - [`Builder`]: declares middleware, mounts and the terminal application,
//!   and resolves them once into a single application
//! - [`UrlMap`]: dispatches by path prefix and host
//! - [`Lint`]: checks both sides of every call against the convention
//! - [`ShowExceptions`]: turns application errors into `500` responses
//! - [`script`]: the same pipeline written as text, resolved by name
//! - [`config`]: server options and their sources
//! - [`handler`]: the seam to actual servers
//! - [`mock`]: requests without a server, for tests
//!
//! # Example
//!
//! ```
//! use lack_http::handler::app_fn;
//! use lack_http::protocol::{Env, Response};
//! use lack_web::mock::MockRequest;
//! use lack_web::{Builder, LintWrapper, ShowExceptionsWrapper};
//!
//! let app = Builder::app(|b| {
//!     b.use_middleware(LintWrapper);
//!     b.use_middleware(ShowExceptionsWrapper);
//!     b.map("/hello", |b| {
//!         b.run(app_fn(|_env: &mut Env| Ok(Response::text(200, "hello"))));
//!     });
//!     b.run(app_fn(|_env: &mut Env| Err("no such page".into())));
//! })
//! .unwrap();
//!
//! let mock = MockRequest::new(app);
//! assert_eq!(mock.get("/hello").unwrap().body(), "hello");
//! assert!(mock.get("/other").unwrap().is_server_error());
//! ```

mod builder;
mod lint;
mod show_exceptions;
mod url_map;
mod utils;

pub mod config;
pub mod handler;
pub mod mock;
pub mod script;
pub mod wrapper;

pub use builder::BuildError;
pub use builder::Builder;
pub use lint::Lint;
pub use lint::LintError;
pub use lint::LintWrapper;
pub use show_exceptions::ShowExceptions;
pub use show_exceptions::ShowExceptionsWrapper;
pub use url_map::normalize_path;
pub use url_map::UrlMap;
pub use url_map::UrlMapBuilder;
pub use url_map::UrlMapError;
