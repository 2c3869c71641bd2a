//! Server handlers.
//!
//! A handler adapts some server to the calling convention: it accepts
//! connections, builds an environment per request and writes the response
//! back. This crate only defines the seam and a registry to pick a handler
//! by name; actual servers live elsewhere.

use std::fmt;
use std::sync::Arc;

use lack_http::handler::BoxedApp;
use lack_http::protocol::BoxError;
use thiserror::Error;
use tracing::debug;

use crate::config::Options;

pub const HANDLER_ENV: &str = "LACK_HANDLER";

pub trait Handler: Send + Sync {
    /// Serves `app` until the server stops.
    fn run(&self, app: BoxedApp, options: &Options) -> Result<(), BoxError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("no handler registered as '{name}'")]
    NotFound { name: String },

    #[error("no handler registered")]
    NoneRegistered,
}

/// Handlers by name, in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<(String, Arc<dyn Handler>)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` as `name`, replacing a previous one of that name.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        let name = name.into();
        let handler: Arc<dyn Handler> = Arc::new(handler);
        match self.handlers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = handler,
            None => self.handlers.push((name, handler)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Handler>, HandlerError> {
        self.handlers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, handler)| Arc::clone(handler))
            .ok_or_else(|| HandlerError::NotFound { name: name.to_owned() })
    }

    /// The handler named by `LACK_HANDLER`, else the first one registered.
    pub fn default_handler(&self) -> Result<Arc<dyn Handler>, HandlerError> {
        let preferred = std::env::var(HANDLER_ENV).ok();
        self.default_with(preferred.as_deref())
    }

    fn default_with(&self, preferred: Option<&str>) -> Result<Arc<dyn Handler>, HandlerError> {
        if let Some(name) = preferred {
            return self.get(name);
        }
        self.handlers.first().map(|(_, handler)| Arc::clone(handler)).ok_or(HandlerError::NoneRegistered)
    }

    /// The handler chosen by `options.server`, or the default one.
    pub fn pick(&self, options: &Options) -> Result<Arc<dyn Handler>, HandlerError> {
        match options.server.as_deref() {
            Some(name) => self.get(name),
            None => self.default_handler(),
        }
    }

    /// Picks a handler for `options` and serves `app` with it.
    pub fn serve(&self, app: BoxedApp, options: &Options) -> Result<(), BoxError> {
        let handler = self.pick(options)?;
        debug!(server = ?options.server, host = ?options.host, port = ?options.port, "starting handler");
        handler.run(app, options)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
