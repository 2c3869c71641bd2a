//! Middleware as wrappers.
//!
//! A middleware is anything that can wrap an inner application into a new
//! one. The [`Builder`](crate::Builder) stores [`BoxedWrapper`]s, each taking
//! and returning a [`BoxedApp`].

use std::fmt;
use std::sync::Arc;

use lack_http::handler::{Application, BoxedApp};

/// A wrapper that can wrap an application into another
pub trait Wrapper<A> {
    /// the wrapper's output
    type Out;

    /// wrap the application into another
    fn wrap(&self, app: A) -> Self::Out;
}

/// A wrapper working on type-erased applications, as stored by the builder.
pub type BoxedWrapper = Box<dyn Wrapper<BoxedApp, Out = BoxedApp> + Send + Sync>;

#[derive(Clone, Copy)]
pub struct WrapperFn<F> {
    f: F,
}

/// Turns a closure from application to application into a [`Wrapper`].
pub fn wrapper_fn<In, Out, F>(f: F) -> WrapperFn<F>
where
    F: Fn(In) -> Out,
{
    WrapperFn { f }
}

impl<In, Out, F> Wrapper<In> for WrapperFn<F>
where
    F: Fn(In) -> Out,
{
    type Out = Out;

    fn wrap(&self, app: In) -> Self::Out {
        (self.f)(app)
    }
}

impl<F> fmt::Debug for WrapperFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WrapperFn")
    }
}

struct Erased<W> {
    wrapper: W,
}

impl<W> Wrapper<BoxedApp> for Erased<W>
where
    W: Wrapper<BoxedApp>,
    W::Out: Application + 'static,
{
    type Out = BoxedApp;

    fn wrap(&self, app: BoxedApp) -> BoxedApp {
        Arc::new(self.wrapper.wrap(app))
    }
}

/// Erases the output type of `wrapper` so it can be stored next to others.
pub fn boxed<W>(wrapper: W) -> BoxedWrapper
where
    W: Wrapper<BoxedApp> + Send + Sync + 'static,
    W::Out: Application + 'static,
{
    Box::new(Erased { wrapper })
}

#[cfg(test)]
mod tests {
    use super::{boxed, wrapper_fn, Wrapper};
    use lack_http::handler::{app_fn, Application, BoxedApp};
    use lack_http::protocol::{Env, Response};
    use std::sync::Arc;

    #[test]
    fn test_boxed_wrapper_fn() {
        let status = boxed(wrapper_fn(|inner: BoxedApp| {
            app_fn(move |env: &mut Env| {
                let mut response = inner.call(env)?;
                response.set_status(201);
                Ok(response)
            })
        }));

        let app: BoxedApp = Arc::new(app_fn(|_env: &mut Env| Ok(Response::new(200))));
        let wrapped = status.wrap(app);
        assert_eq!(wrapped.call(&mut Env::new()).unwrap().status(), 201);
    }
}
