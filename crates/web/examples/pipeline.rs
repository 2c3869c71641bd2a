use lack_http::handler::app_fn;
use lack_http::protocol::{Env, Response};
use lack_web::mock::{MockOptions, MockRequest};
use lack_web::{Builder, LintWrapper, ShowExceptionsWrapper};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn hello(env: &mut Env) -> Result<Response, lack_http::protocol::BoxError> {
    Ok(Response::text(200, format!("hello from {}{}\n", env.script_name(), env.path_info())))
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let app = Builder::app(|b| {
        b.use_middleware(ShowExceptionsWrapper);
        b.use_middleware(LintWrapper);
        b.map("/hello", |b| {
            b.run(app_fn(hello));
        });
        b.map("/broken", |b| {
            b.run(app_fn(|_env: &mut Env| Ok(Response::new(204).with_header("Content-Type", "text/plain"))));
        });
        b.run(app_fn(|_env: &mut Env| Err("nothing mounted here".into())));
    })
    .expect("pipeline has a terminal application");

    let mock = MockRequest::new(app);
    for path in ["/hello", "/hello/world", "/broken", "/missing"] {
        match mock.request(http::Method::GET, path, MockOptions::new()) {
            Ok(response) => info!(path, status = response.status(), body = %response.body().trim_end(), "response"),
            Err(e) => info!(path, cause = %e, "request failed"),
        }
    }
}
