//! Prefix dispatch over several applications.
//!
//! A [`UrlMap`] holds a list of locations, each optionally pinned to a host,
//! and hands a request to the application mounted at the longest location
//! that prefixes its path on a segment boundary. The matched prefix moves
//! from `PATH_INFO` to `SCRIPT_NAME` for the duration of the call.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use lack_http::handler::{Application, BoxedApp};
use lack_http::protocol::{keys, BoxError, Env, Response, Value};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlMapError {
    #[error("paths need to start with /, got '{location}'")]
    InvalidLocation { location: String },
}

pub struct UrlMap {
    mapping: Vec<Mapping>,
    fallback: Option<BoxedApp>,
}

struct Mapping {
    host: Option<String>,
    location: String,
    /// Non-empty segments in `location`.
    segments: usize,
    app: BoxedApp,
}

impl UrlMap {
    pub fn builder() -> UrlMapBuilder {
        UrlMapBuilder::new()
    }

    /// Builds a map from `(location, app)` pairs without a fallback.
    pub fn new<I, S>(entries: I) -> Result<Self, UrlMapError>
    where
        I: IntoIterator<Item = (S, BoxedApp)>,
        S: Into<String>,
    {
        entries.into_iter().fold(Self::builder(), |builder, (location, app)| builder.mount_boxed(location, app)).build()
    }

    /// The mounted locations in matching order, as `(host, location)`.
    pub fn locations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.mapping.iter().map(|m| (m.host.as_deref(), m.location.as_str()))
    }
}

impl fmt::Debug for UrlMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlMap")
            .field("locations", &self.locations().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct UrlMapBuilder {
    entries: Vec<(String, BoxedApp)>,
    fallback: Option<BoxedApp>,
}

impl UrlMapBuilder {
    fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mount<A>(self, location: impl Into<String>, app: A) -> Self
    where
        A: Application + 'static,
    {
        self.mount_boxed(location, Arc::new(app))
    }

    #[must_use]
    pub fn mount_boxed(mut self, location: impl Into<String>, app: BoxedApp) -> Self {
        self.entries.push((location.into(), app));
        self
    }

    /// Application called when no location matches, instead of answering 404.
    #[must_use]
    pub fn fallback(mut self, app: BoxedApp) -> Self {
        self.fallback = Some(app);
        self
    }

    pub fn build(self) -> Result<UrlMap, UrlMapError> {
        let mut mapping = self
            .entries
            .into_iter()
            .map(|(location, app)| Mapping::parse(&location, app))
            .collect::<Result<Vec<_>, _>>()?;

        // stable: equal keys keep declaration order
        mapping.sort_by_key(|m| (Reverse(m.location.len()), m.host.is_none()));

        Ok(UrlMap { mapping, fallback: self.fallback })
    }
}

impl fmt::Debug for UrlMapBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlMapBuilder")
            .field("locations", &self.entries.iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Mapping {
    fn parse(raw: &str, app: BoxedApp) -> Result<Self, UrlMapError> {
        let invalid = || UrlMapError::InvalidLocation { location: raw.to_owned() };

        let (host, path) = match raw.strip_prefix("http://").or_else(|| raw.strip_prefix("https://")) {
            Some(rest) => {
                let slash = rest.find('/').ok_or_else(invalid)?;
                (Some(rest[..slash].to_owned()), &rest[slash..])
            }
            None => (None, raw),
        };

        if !path.starts_with('/') {
            return Err(invalid());
        }

        let mut location = normalize_path(path).into_owned();
        if location.ends_with('/') {
            location.pop();
        }

        let segments = location.split('/').filter(|segment| !segment.is_empty()).count();
        Ok(Self { host, location, segments, app })
    }

    fn accepts_host(&self, http_host: Option<&str>, server_name: Option<&str>, server_port: Option<&str>) -> bool {
        let with_port = |name: &str, port: Option<&str>| port.map(|port| format!("{name}:{port}"));

        match &self.host {
            Some(host) => {
                eq_ignore_case(http_host, host)
                    || eq_ignore_case(server_name, host)
                    || server_name
                        .and_then(|name| with_port(name, server_port))
                        .is_some_and(|s| s.eq_ignore_ascii_case(host))
            }
            None => match (http_host, server_name) {
                (None, _) => true,
                (Some(http_host), Some(name)) => {
                    http_host.eq_ignore_ascii_case(name)
                        || with_port(name, server_port).is_some_and(|s| s.eq_ignore_ascii_case(http_host))
                }
                (Some(_), None) => false,
            },
        }
    }

    /// Whether this location prefixes `path` on a segment boundary.
    fn prefixes(&self, path: &str) -> bool {
        path.strip_prefix(self.location.as_str()).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// What follows the first `segments` non-empty segments of `path`, as
/// written. Normalizing neither adds nor removes non-empty segments, so a
/// match found on the normalized path lines up with the raw one.
fn skip_segments(path: &str, segments: usize) -> &str {
    let mut rest = path;
    for _ in 0..segments {
        let trimmed = rest.trim_start_matches('/');
        let end = trimmed.find('/').unwrap_or(trimmed.len());
        rest = &trimmed[end..];
    }
    rest
}

fn eq_ignore_case(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(expected))
}

/// Collapses repeated `/` and decodes percent-escapes segment by segment.
///
/// An escape that is malformed, or that would decode to a `/`, is kept as
/// written so decoding never changes the segment structure.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if !path.contains("//") && !path.contains('%') {
        return Cow::Borrowed(path);
    }

    let mut normalized = String::with_capacity(path.len());
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 && !normalized.ends_with('/') {
            normalized.push('/');
        }
        normalized.push_str(&decode_segment(segment));
    }
    Cow::Owned(normalized)
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }
    match urlencoding::decode(segment) {
        Ok(decoded) if !decoded.contains('/') => decoded,
        _ => Cow::Borrowed(segment),
    }
}

fn not_found() -> Response {
    Response::new(404)
        .with_header(http::header::CONTENT_TYPE.as_str(), mime::TEXT_PLAIN.as_ref())
        .with_header(http::header::CONTENT_LENGTH.as_str(), "0")
        .with_header("X-Cascade", "pass")
}

impl Application for UrlMap {
    fn call(&self, env: &mut Env) -> Result<Response, BoxError> {
        let path = normalize_path(env.path_info()).into_owned();

        let matched = {
            let http_host = env.get_str(keys::HTTP_HOST);
            let server_name = env.get_str(keys::SERVER_NAME);
            let server_port = env.get_str(keys::SERVER_PORT);

            self.mapping
                .iter()
                .find(|mapping| mapping.accepts_host(http_host, server_name, server_port) && mapping.prefixes(&path))
        };

        let Some(mapping) = matched else {
            if let Some(fallback) = &self.fallback {
                trace!(path = %path, "no location matched, calling fallback");
                return fallback.call(env);
            }
            trace!(path = %path, "no location matched");
            return Ok(not_found());
        };

        let script_name = format!("{}{}", env.script_name(), mapping.location);
        let rest = skip_segments(env.path_info(), mapping.segments);
        let path_info = if rest.is_empty() && script_name.is_empty() { "/".to_owned() } else { rest.to_owned() };
        trace!(location = %mapping.location, script_name = %script_name, path_info = %path_info, "dispatch");

        let mut scoped = ScopedPath::enter(env, script_name, path_info);
        mapping.app.call(&mut scoped)
    }
}

/// Rewrites `SCRIPT_NAME` and `PATH_INFO` for a sub-application and puts the
/// previous values back when dropped, whether the call returned or unwound.
struct ScopedPath<'a> {
    env: &'a mut Env,
    script_name: Option<Value>,
    path_info: Option<Value>,
}

impl<'a> ScopedPath<'a> {
    fn enter(env: &'a mut Env, script_name: String, path_info: String) -> Self {
        let script_name = env.set(keys::SCRIPT_NAME, script_name);
        let path_info = env.set(keys::PATH_INFO, path_info);
        Self { env, script_name, path_info }
    }
}

impl Deref for ScopedPath<'_> {
    type Target = Env;

    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for ScopedPath<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Drop for ScopedPath<'_> {
    fn drop(&mut self) {
        for (key, saved) in [(keys::SCRIPT_NAME, self.script_name.take()), (keys::PATH_INFO, self.path_info.take())] {
            match saved {
                Some(value) => {
                    self.env.set(key, value);
                }
                None => {
                    self.env.remove(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_path, skip_segments, UrlMap, UrlMapError};
    use lack_http::handler::{app_fn, Application, BoxedApp};
    use lack_http::protocol::{keys, Env, Response};
    use std::sync::Arc;

    fn echo(name: &'static str) -> BoxedApp {
        Arc::new(app_fn(move |env: &mut Env| {
            let body = format!("{name} {} {}", env.script_name(), env.path_info());
            Ok(Response::text(200, body).with_header("X-Position", name))
        }))
    }

    fn env(path: &str) -> Env {
        let mut env = Env::new();
        env.set(keys::SCRIPT_NAME, "");
        env.set(keys::PATH_INFO, path);
        env.set(keys::SERVER_NAME, "example.org");
        env.set(keys::SERVER_PORT, "80");
        env
    }

    fn dispatch(map: &UrlMap, path: &str) -> (u16, String) {
        let mut response = map.call(&mut env(path)).unwrap();
        let body = response.body_mut().collect_bytes().unwrap();
        (response.status(), String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_segment_boundary() {
        let map = UrlMap::new([("/sub", echo("sub"))]).unwrap();

        assert_eq!(dispatch(&map, "/sub"), (200, "sub /sub ".into()));
        assert_eq!(dispatch(&map, "/sub/"), (200, "sub /sub /".into()));
        assert_eq!(dispatch(&map, "/sub/x"), (200, "sub /sub /x".into()));
        assert_eq!(dispatch(&map, "/subscription").0, 404);
    }

    #[test]
    fn test_longest_location_wins() {
        let map = UrlMap::new([("/", echo("root")), ("/foo", echo("foo")), ("/foo/bar", echo("bar"))]).unwrap();

        assert_eq!(dispatch(&map, "/foo/bar/baz"), (200, "bar /foo/bar /baz".into()));
        assert_eq!(dispatch(&map, "/foo/quux"), (200, "foo /foo /quux".into()));
        assert_eq!(dispatch(&map, "/other"), (200, "root  /other".into()));
    }

    #[test]
    fn test_root_mount_keeps_slash() {
        let map = UrlMap::new([("/", echo("root"))]).unwrap();
        assert_eq!(dispatch(&map, "/"), (200, "root  /".into()));
    }

    #[test]
    fn test_not_found() {
        let map = UrlMap::new([("/foo", echo("foo"))]).unwrap();
        let mut response = map.call(&mut env("/bar")).unwrap();

        assert_eq!(response.status(), 404);
        assert_eq!(response.headers().get("Content-Type"), Some("text/plain"));
        assert_eq!(response.headers().get("Content-Length"), Some("0"));
        assert_eq!(response.headers().get("X-Cascade"), Some("pass"));
        assert!(response.body_mut().collect_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_fallback() {
        let map = UrlMap::builder().mount_boxed("/foo", echo("foo")).fallback(echo("default")).build().unwrap();
        assert_eq!(dispatch(&map, "/bar"), (200, "default  /bar".into()));
    }

    #[test]
    fn test_invalid_location() {
        let err = UrlMap::new([("foo", echo("foo"))]).unwrap_err();
        assert_eq!(err, UrlMapError::InvalidLocation { location: "foo".into() });

        assert!(UrlMap::new([("http://example.org", echo("foo"))]).is_err());
    }

    #[test]
    fn test_host_pinned() {
        let map = UrlMap::new([("/", echo("default")), ("http://foo.org/", echo("foo.org"))]).unwrap();

        let mut env = env("/");
        env.set(keys::HTTP_HOST, "foo.org");
        env.set(keys::SERVER_NAME, "foo.org");
        let response = map.call(&mut env).unwrap();
        assert_eq!(response.headers().get("X-Position"), Some("foo.org"));

        let mut env = self::env("/");
        env.set(keys::HTTP_HOST, "example.org");
        let response = map.call(&mut env).unwrap();
        assert_eq!(response.headers().get("X-Position"), Some("default"));

        let mut env = self::env("/");
        env.set(keys::HTTP_HOST, "example.org:80");
        let response = map.call(&mut env).unwrap();
        assert_eq!(response.headers().get("X-Position"), Some("default"));
    }

    #[test]
    fn test_unknown_host_skips_hostless() {
        let map = UrlMap::new([("/", echo("default"))]).unwrap();

        let mut env = env("/");
        env.set(keys::HTTP_HOST, "elsewhere.org");
        assert_eq!(map.call(&mut env).unwrap().status(), 404);
    }

    #[test]
    fn test_restores_paths() {
        let map = UrlMap::new([("/foo", echo("foo"))]).unwrap();
        let mut env = env("/foo/bar");
        env.set(keys::SCRIPT_NAME, "/app");

        map.call(&mut env).unwrap();
        assert_eq!(env.script_name(), "/app");
        assert_eq!(env.path_info(), "/foo/bar");
    }

    #[test]
    fn test_restores_paths_on_error() {
        let failing: BoxedApp = Arc::new(app_fn(|_env: &mut Env| Err("boom".into())));
        let map = UrlMap::new([("/foo", failing)]).unwrap();
        let mut env = env("/foo/bar");

        assert!(map.call(&mut env).is_err());
        assert_eq!(env.script_name(), "");
        assert_eq!(env.path_info(), "/foo/bar");
    }

    #[test]
    fn test_sub_app_changes_stay_visible() {
        let writer: BoxedApp = Arc::new(app_fn(|env: &mut Env| {
            env.set("app.user", "alice");
            env.set(keys::QUERY_STRING, "rewritten=1");
            Ok(Response::new(200))
        }));
        let map = UrlMap::new([("/foo", writer)]).unwrap();
        let mut env = env("/foo/bar");
        env.set(keys::QUERY_STRING, "");

        map.call(&mut env).unwrap();
        assert_eq!(env.get_str("app.user"), Some("alice"));
        assert_eq!(env.get_str(keys::QUERY_STRING), Some("rewritten=1"));
        assert_eq!(env.path_info(), "/foo/bar");
    }

    #[test]
    fn test_nested_script_name() {
        let inner = Arc::new(UrlMap::new([("/bar", echo("bar"))]).unwrap());
        let map = UrlMap::new([("/foo", inner as BoxedApp)]).unwrap();

        assert_eq!(dispatch(&map, "/foo/bar/baz"), (200, "bar /foo/bar /baz".into()));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/foo"), "/foo");
        assert_eq!(normalize_path("//foo///bar"), "/foo/bar");
        assert_eq!(normalize_path("/foo%20bar"), "/foo bar");
        assert_eq!(normalize_path("/foo%2Fbar"), "/foo%2Fbar");
        assert_eq!(normalize_path("/foo%zzbar"), "/foo%zzbar");
    }

    #[test]
    fn test_rest_keeps_raw_path() {
        let map = UrlMap::new([("/sub", echo("sub"))]).unwrap();

        assert_eq!(dispatch(&map, "/sub/a%2520b//c"), (200, "sub /sub /a%2520b//c".into()));
        assert_eq!(dispatch(&map, "//sub/x%2Fy"), (200, "sub /sub /x%2Fy".into()));
        assert_eq!(dispatch(&map, "/s%75b/x"), (200, "sub /sub /x".into()));
    }

    #[test]
    fn test_skip_segments() {
        assert_eq!(skip_segments("/a/b/c", 0), "/a/b/c");
        assert_eq!(skip_segments("/a/b/c", 2), "/c");
        assert_eq!(skip_segments("//a///b", 1), "///b");
        assert_eq!(skip_segments("/a/", 1), "/");
        assert_eq!(skip_segments("/a", 1), "");
    }

    #[test]
    fn test_escaped_location() {
        let map = UrlMap::new([("/foo bar", echo("space"))]).unwrap();
        assert_eq!(dispatch(&map, "/foo%20bar/x"), (200, "space /foo bar /x".into()));
    }
}
