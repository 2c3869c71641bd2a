use lack_http::handler::{app_fn, BoxedApp};
use lack_http::protocol::{BoxError, Env, Response};
use lack_web::config::Options;
use lack_web::handler::{Handler, HandlerRegistry};
use lack_web::mock::MockRequest;
use lack_web::script::{self, Registry};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const SCRIPT: &str = r"
#\ -p 8080 -O workers=4
use show_exceptions
use lint

map /admin do
  run admin
end

run hello
";

/// Plays a few requests against the application instead of listening.
struct Replay;

impl Handler for Replay {
    fn run(&self, app: BoxedApp, options: &Options) -> Result<(), BoxError> {
        info!(port = ?options.port, workers = ?options.server_option("workers"), "replaying requests");
        let mock = MockRequest::new(app);
        for path in ["/", "/admin", "/admin/users"] {
            let response = mock.get(path)?;
            info!(path, status = response.status(), body = %response.body(), "response");
        }
        Ok(())
    }
}

fn main() -> Result<(), BoxError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut registry = Registry::with_builtins();
    registry
        .app("hello", app_fn(|_env: &mut Env| Ok(Response::text(200, "hello"))))
        .app("admin", app_fn(|env: &mut Env| Ok(Response::text(200, format!("admin {}", env.path_info())))));

    let explicit = Options::parse_words(std::env::args().skip(1))?;
    let (app, options) = script::parse_str(SCRIPT, &registry, explicit)?;
    let options = Options::defaults_from_env().merge_beneath(options);

    let mut handlers = HandlerRegistry::new();
    handlers.register("replay", Replay);
    handlers.serve(app, &options)
}
