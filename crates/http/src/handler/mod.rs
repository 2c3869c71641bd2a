use std::fmt;
use std::sync::Arc;

use crate::protocol::{BoxError, Env, Response};

/// Anything that answers a request.
///
/// Terminal applications and middleware share this one method: take the
/// environment, return the response triple. A finished pipeline is invoked
/// concurrently from many threads, hence `Send + Sync`.
#[cfg_attr(test, mockall::automock)]
pub trait Application: Send + Sync {
    fn call(&self, env: &mut Env) -> Result<Response, BoxError>;
}

/// A shared, type-erased application.
pub type BoxedApp = Arc<dyn Application>;

impl fmt::Debug for dyn Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Application")
    }
}

pub struct AppFn<F> {
    f: F,
}

impl<F> Application for AppFn<F>
where
    F: Fn(&mut Env) -> Result<Response, BoxError> + Send + Sync,
{
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        (self.f)(env)
    }
}

impl<F> fmt::Debug for AppFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppFn")
    }
}

/// Turns a closure into an [`Application`].
pub fn app_fn<F>(f: F) -> AppFn<F>
where
    F: Fn(&mut Env) -> Result<Response, BoxError> + Send + Sync,
{
    AppFn { f }
}

impl<A: Application + ?Sized> Application for Box<A> {
    #[inline]
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        (**self).call(env)
    }
}

impl<A: Application + ?Sized> Application for Arc<A> {
    #[inline]
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        (**self).call(env)
    }
}

impl<A: Application + ?Sized> Application for &A {
    #[inline]
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        (**self).call(env)
    }
}
