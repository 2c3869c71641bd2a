//! Declarative pipeline assembly.
//!
//! A [`Builder`] collects middleware (`use_middleware`), one terminal
//! application (`run`), nested path mounts (`map`) and warmup hooks, then
//! resolves them into a single application. The first middleware declared
//! ends up outermost, so it sees the request first and the response last.
//!
//! Resolution happens once. Every later call reuses the resolved pipeline,
//! so middleware is instantiated exactly once however many requests go
//! through it.
//!
//! ```
//! use lack_http::handler::{app_fn, Application};
//! use lack_http::protocol::{Env, Response};
//! use lack_web::Builder;
//!
//! let app = Builder::app(|b| {
//!     b.map("/admin", |b| {
//!         b.run(app_fn(|_env: &mut Env| Ok(Response::text(200, "admin"))));
//!     });
//!     b.run(app_fn(|_env: &mut Env| Ok(Response::text(200, "home"))));
//! })
//! .unwrap();
//! # let _ = app;
//! ```

use std::fmt;
use std::sync::Arc;

use lack_http::handler::{Application, BoxedApp};
use lack_http::protocol::{BoxError, Env, Response};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::debug;

use crate::url_map::{UrlMap, UrlMapError};
use crate::wrapper::{self, BoxedWrapper, Wrapper};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing run or map statement")]
    MissingRun,

    #[error("invalid map location: {source}")]
    InvalidLocation {
        #[from]
        source: UrlMapError,
    },
}

type WarmupFn = Box<dyn Fn(&BoxedApp) + Send + Sync>;

#[derive(Default)]
pub struct Builder {
    uses: Vec<BoxedWrapper>,
    run: Option<BoxedApp>,
    maps: Vec<(String, Builder)>,
    warmups: Vec<WarmupFn>,
    app: OnceCell<BoxedApp>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a pipeline with `f` and resolves it right away.
    pub fn app<F>(f: F) -> Result<BoxedApp, BuildError>
    where
        F: FnOnce(&mut Builder),
    {
        let mut builder = Self::new();
        f(&mut builder);
        builder.to_app()
    }

    /// Adds a middleware. Declaration order is wrapping order, outermost
    /// first.
    pub fn use_middleware<W>(&mut self, wrapper: W) -> &mut Self
    where
        W: Wrapper<BoxedApp> + Send + Sync + 'static,
        W::Out: Application + 'static,
    {
        self.use_boxed(wrapper::boxed(wrapper))
    }

    pub fn use_boxed(&mut self, wrapper: BoxedWrapper) -> &mut Self {
        self.uses.push(wrapper);
        self
    }

    /// Sets the terminal application. A later `run` replaces an earlier one.
    pub fn run<A>(&mut self, app: A) -> &mut Self
    where
        A: Application + 'static,
    {
        self.run_boxed(Arc::new(app))
    }

    pub fn run_boxed(&mut self, app: BoxedApp) -> &mut Self {
        self.run = Some(app);
        self
    }

    /// Mounts a nested pipeline under `location`.
    ///
    /// A nested pipeline without its own `run` ends in this builder's
    /// terminal application. Locations are checked when the pipeline is
    /// resolved.
    pub fn map<F>(&mut self, location: impl Into<String>, f: F) -> &mut Self
    where
        F: FnOnce(&mut Builder),
    {
        let mut builder = Builder::new();
        f(&mut builder);
        self.maps.push((location.into(), builder));
        self
    }

    /// Registers a hook called with the resolved application.
    pub fn warmup<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&BoxedApp) + Send + Sync + 'static,
    {
        self.warmups.push(Box::new(hook));
        self
    }

    /// Resolves the pipeline, or returns the one resolved before.
    pub fn to_app(&self) -> Result<BoxedApp, BuildError> {
        self.app.get_or_try_init(|| self.resolve(None)).map(Arc::clone)
    }

    fn resolve(&self, outer_run: Option<&BoxedApp>) -> Result<BoxedApp, BuildError> {
        let run = self.run.as_ref().or(outer_run);
        debug!(uses = self.uses.len(), maps = self.maps.len(), has_run = run.is_some(), "resolving pipeline");

        let mut app = if self.maps.is_empty() {
            run.map(Arc::clone).ok_or(BuildError::MissingRun)?
        } else {
            let mut url_map = UrlMap::builder();
            for (location, builder) in &self.maps {
                url_map = url_map.mount_boxed(location.clone(), builder.resolve(run)?);
            }
            if let Some(run) = run {
                url_map = url_map.fallback(Arc::clone(run));
            }
            Arc::new(url_map.build()?) as BoxedApp
        };

        for wrapper in self.uses.iter().rev() {
            app = wrapper.wrap(app);
        }

        for hook in &self.warmups {
            hook(&app);
        }

        Ok(app)
    }
}

impl Application for Builder {
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        self.to_app()?.call(env)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("uses", &self.uses.len())
            .field("run", &self.run.is_some())
            .field("maps", &self.maps)
            .field("warmups", &self.warmups.len())
            .field("resolved", &self.app.get().is_some())
            .finish()
    }
}
