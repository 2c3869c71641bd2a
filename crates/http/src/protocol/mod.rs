//! The calling convention shared by every application and middleware.
//!
//! # Architecture
//!
//! - **Environment** ([`env`]): the per-request key/value map
//!   - [`Env`]: the map itself, passed by mutable reference down the chain
//!   - [`Value`]: one typed value
//!   - [`keys`]: names of the well-known keys
//!
//! - **Streams** ([`stream`]): capabilities installed in the environment
//!   - [`InputStream`]: the request body
//!   - [`ErrorStream`]: where applications report problems
//!   - [`Logger`]: leveled logging offered to applications
//!
//! - **Response** ([`response`], [`body`]): the three-part result
//!   - [`Response`]: status, [`Headers`] and [`ResponseBody`]
//!   - [`Body`]: custom streaming bodies
//!
//! - **Error Handling** ([`error`])
//!   - [`BoxError`]: what applications and streams return
//!   - [`StreamError`]: failures of the bundled streams

mod env;
pub use env::Env;
pub use env::HijackFn;
pub use env::Value;

pub mod keys;

mod stream;
pub use stream::ErrorBuffer;
pub use stream::ErrorStream;
pub use stream::InputStream;
pub use stream::Logger;
pub use stream::NullInput;
pub use stream::StringInput;
pub use stream::TracingErrors;
pub use stream::TracingLogger;

mod response;
pub use response::Headers;
pub use response::Response;

mod error;
pub use error::BoxError;
pub use error::StreamError;

pub mod body;
pub use body::Body;
pub use body::ResponseBody;
