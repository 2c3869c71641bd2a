use lack_http::handler::{app_fn, BoxedApp};
use lack_http::protocol::{Env, Response};
use lack_web::Builder;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    uri: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, uri: &'static str) -> Self {
        Self { name, group, uri }
    }

    pub fn small(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Small, uri)
    }

    pub fn normal(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Normal, uri)
    }

    pub fn large(name: &'static str, uri: &'static str) -> Self {
        Self::new(name, TestGroup::Large, uri)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    /// Number of mounts the application under test should carry.
    pub fn mounts(&self) -> usize {
        match self.group {
            TestGroup::Small => 4,
            TestGroup::Normal => 32,
            TestGroup::Large => 256,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

/// An application with `mounts` locations `/app0` .. `/appN`, each nested one
/// level deeper under `/v1`, and a fallback at the root.
pub fn mounted_app(mounts: usize) -> BoxedApp {
    let result = Builder::app(|b| {
        for i in 0..mounts {
            b.map(format!("/app{i}"), |b| {
                b.map("/v1", |b| {
                    b.run(app_fn(|env: &mut Env| Ok(Response::text(200, env.path_info().to_owned()))));
                });
            });
        }
        b.run(app_fn(|_env: &mut Env| Ok(Response::new(404))));
    });

    match result {
        Ok(app) => app,
        Err(e) => panic!("benchmark application must build: {e}"),
    }
}
