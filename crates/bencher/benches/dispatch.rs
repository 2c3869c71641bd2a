use std::hint::black_box;

use bencher::{mounted_app, TestCase};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use lack_web::mock::{MockOptions, MockRequest};
use lack_web::script::{self, Registry};
use lack_http::handler::{app_fn, Application};
use lack_http::protocol::{Env, Response};

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_first_mount", "/app0/v1/users"),
        TestCase::normal("normal_last_mount", "/app31/v1/users"),
        TestCase::large("large_last_mount", "/app255/v1/users"),
        TestCase::large("large_fallback", "/missing/users"),
    ]
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("url_map_dispatch");

    for case in create_test_cases() {
        let app = mounted_app(case.mounts());
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let mut env = MockRequest::env_for(case.uri(), MockOptions::new()).expect("benchmark uri should be valid");
            b.iter(|| black_box(app.call(&mut env).expect("dispatch should not fail")));
        });
    }

    group.finish();
}

fn benchmark_lint(criterion: &mut Criterion) {
    let app = app_fn(|_env: &mut Env| Ok(Response::text(200, "hello world")));
    let mock = MockRequest::new(app);

    let mut group = criterion.benchmark_group("mock_request");
    group.bench_function("plain", |b| b.iter(|| black_box(mock.get("/hello").expect("request should succeed"))));
    group.bench_function("linted", |b| {
        b.iter(|| {
            let options = MockOptions::new().lint(true);
            black_box(mock.request(Method::GET, "/hello", options).expect("request should pass lint"))
        });
    });
    group.finish();
}

fn benchmark_script(criterion: &mut Criterion) {
    let mut registry = Registry::with_builtins();
    registry.app("hello", app_fn(|_env: &mut Env| Ok(Response::text(200, "hello"))));
    let text = concat!(
        "#\\ -p 8080\nuse show_exceptions\n",
        "map /a do\n  run hello\nend\n",
        "map /b do\n  run hello\nend\n",
        "run hello\n",
    );

    criterion.bench_function("script_parse", |b| {
        b.iter(|| black_box(script::new_from_string(black_box(text), &registry).expect("script should parse")));
    });
}

criterion_group!(dispatch, benchmark_dispatch, benchmark_lint, benchmark_script);
criterion_main!(dispatch);
