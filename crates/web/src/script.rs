//! Pipelines described as text.
//!
//! A script names middleware, applications and warmup hooks; the names are
//! resolved against a [`Registry`]. The grammar is line based:
//!
//! ```text
//! #\ -p 8080 --env deployment
//! use show_exceptions
//! use basic_auth secret
//! map /admin do
//!   run admin
//! end
//! run hello
//! warmup preload
//! __END__
//! everything from here on is ignored
//! ```
//!
//! `#\` lines carry [`Options`] words. Other `#` lines, blank lines and
//! `=begin`/`=end` blocks are comments.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use lack_http::handler::{Application, BoxedApp};
use lack_http::protocol::BoxError;
use thiserror::Error;
use tracing::debug;

use crate::builder::{BuildError, Builder};
use crate::config::Options;
use crate::lint::LintWrapper;
use crate::show_exceptions::ShowExceptionsWrapper;
use crate::wrapper::{self, BoxedWrapper};

pub type MiddlewareFactory = Arc<dyn Fn(&[String]) -> Result<BoxedWrapper, BoxError> + Send + Sync>;
pub type WarmupHook = Arc<dyn Fn(&BoxedApp) + Send + Sync>;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: '{directive}' expects {expected}")]
    MissingArgument { line: usize, directive: &'static str, expected: &'static str },

    #[error("line {line}: no {kind} registered as '{name}'")]
    UnknownName { line: usize, kind: &'static str, name: String },

    #[error("line {line}: map block is never closed with 'end'")]
    MissingEnd { line: usize },

    #[error("line {line}: 'end' without an open map block")]
    StrayEnd { line: usize },

    #[error("line {line}: invalid options: {source}")]
    Options {
        line: usize,
        #[source]
        source: clap::Error,
    },

    #[error("line {line}: middleware '{name}' could not be created: {source}")]
    Factory {
        line: usize,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to build the application: {source}")]
    Build {
        #[from]
        source: BuildError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What script names resolve to.
#[derive(Default)]
pub struct Registry {
    middleware: HashMap<String, MiddlewareFactory>,
    apps: HashMap<String, BoxedApp>,
    warmups: HashMap<String, WarmupHook>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the middleware shipped with this crate, `lint` and
    /// `show_exceptions`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .middleware("lint", |_args| Ok(wrapper::boxed(LintWrapper)))
            .middleware("show_exceptions", |_args| Ok(wrapper::boxed(ShowExceptionsWrapper)));
        registry
    }

    /// Registers a middleware factory, called with the arguments following
    /// the name on the `use` line.
    pub fn middleware<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&[String]) -> Result<BoxedWrapper, BoxError> + Send + Sync + 'static,
    {
        self.middleware.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn app<A>(&mut self, name: impl Into<String>, app: A) -> &mut Self
    where
        A: Application + 'static,
    {
        self.apps.insert(name.into(), Arc::new(app));
        self
    }

    pub fn warmup<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&BoxedApp) + Send + Sync + 'static,
    {
        self.warmups.insert(name.into(), Arc::new(hook));
        self
    }
}

fn sorted_names<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<_> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("middleware", &sorted_names(&self.middleware))
            .field("apps", &sorted_names(&self.apps))
            .field("warmups", &sorted_names(&self.warmups))
            .finish()
    }
}

/// Builds the application described by `text`, together with the options
/// from its `#\` lines merged beneath `explicit`.
pub fn parse_str(text: &str, registry: &Registry, explicit: Options) -> Result<(BoxedApp, Options), ScriptError> {
    let lines = preprocess(text);
    let options = collect_options(&lines)?;

    let mut builder = Builder::new();
    let mut parser = Parser { lines: lines.iter(), registry };
    parser.block(&mut builder, None)?;

    let app = builder.to_app()?;
    debug!(lines = lines.len(), "script loaded");
    Ok((app, options.merge_beneath(explicit)))
}

/// Like [`parse_str`], reading the script from `path`.
pub fn parse_file(
    path: impl AsRef<Path>,
    registry: &Registry,
    mut explicit: Options,
) -> Result<(BoxedApp, Options), ScriptError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| ScriptError::Io { path: path.display().to_string(), source })?;

    if explicit.config.is_none() {
        explicit.config = Some(path.to_path_buf());
    }
    parse_str(&text, registry, explicit)
}

/// Builds the application described by `text`, ignoring option lines.
pub fn new_from_string(text: &str, registry: &Registry) -> Result<BoxedApp, ScriptError> {
    parse_str(text, registry, Options::default()).map(|(app, _)| app)
}

struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Numbers the lines, stopping at `__END__` and dropping `=begin` blocks.
fn preprocess(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut in_comment_block = false;

    for (i, raw) in text.lines().enumerate() {
        let text = raw.trim();
        if text == "__END__" {
            break;
        }
        if in_comment_block {
            in_comment_block = !text.starts_with("=end");
            continue;
        }
        if text.starts_with("=begin") {
            in_comment_block = true;
            continue;
        }
        lines.push(Line { number: i + 1, text });
    }
    lines
}

fn collect_options(lines: &[Line<'_>]) -> Result<Options, ScriptError> {
    let mut options = Options::default();
    for line in lines {
        if let Some(words) = line.text.strip_prefix("#\\") {
            let parsed = Options::parse_words(words.split_whitespace())
                .map_err(|source| ScriptError::Options { line: line.number, source })?;
            options = options.merge_beneath(parsed);
        }
    }
    Ok(options)
}

struct Parser<'l, 'a> {
    lines: std::slice::Iter<'l, Line<'a>>,
    registry: &'l Registry,
}

impl Parser<'_, '_> {
    /// Parses directives into `builder` until the matching `end`, or the end
    /// of the script at top level. `opened_at` is the line of the `map`
    /// owning this block.
    fn block(&mut self, builder: &mut Builder, opened_at: Option<usize>) -> Result<(), ScriptError> {
        while let Some(line) = self.lines.next() {
            if line.text.is_empty() || line.text.starts_with('#') {
                continue;
            }

            let mut words = line.text.split_whitespace();
            let directive = words.next().unwrap_or_default();
            let args: Vec<String> = words.map(str::to_owned).collect();

            match directive {
                "use" => self.use_middleware(builder, line.number, &args)?,
                "run" => {
                    let name = single(line.number, "run", "an application name", &args)?;
                    let app = self.registry.apps.get(name).ok_or_else(|| unknown(line.number, "application", name))?;
                    builder.run_boxed(Arc::clone(app));
                }
                "warmup" => {
                    let name = single(line.number, "warmup", "a hook name", &args)?;
                    let hook =
                        self.registry.warmups.get(name).ok_or_else(|| unknown(line.number, "warmup hook", name))?;
                    let hook = Arc::clone(hook);
                    builder.warmup(move |app| hook(app));
                }
                "map" => {
                    let location = match args.as_slice() {
                        [location, keyword] if keyword == "do" => location.clone(),
                        _ => {
                            return Err(ScriptError::MissingArgument {
                                line: line.number,
                                directive: "map",
                                expected: "a location followed by 'do'",
                            });
                        }
                    };
                    let mut nested = Ok(());
                    builder.map(location, |sub| nested = self.block(sub, Some(line.number)));
                    nested?;
                }
                "end" => {
                    return match opened_at {
                        Some(_) => Ok(()),
                        None => Err(ScriptError::StrayEnd { line: line.number }),
                    };
                }
                other => {
                    return Err(ScriptError::UnknownDirective { line: line.number, directive: other.to_owned() });
                }
            }
        }

        match opened_at {
            Some(line) => Err(ScriptError::MissingEnd { line }),
            None => Ok(()),
        }
    }

    fn use_middleware(&self, builder: &mut Builder, line: usize, args: &[String]) -> Result<(), ScriptError> {
        let Some((name, rest)) = args.split_first() else {
            return Err(ScriptError::MissingArgument { line, directive: "use", expected: "a middleware name" });
        };
        let factory = self.registry.middleware.get(name).ok_or_else(|| unknown(line, "middleware", name))?;
        let wrapper = factory(rest).map_err(|source| ScriptError::Factory { line, name: name.clone(), source })?;
        builder.use_boxed(wrapper);
        Ok(())
    }
}

fn single<'s>(
    line: usize,
    directive: &'static str,
    expected: &'static str,
    args: &'s [String],
) -> Result<&'s str, ScriptError> {
    match args {
        [name] => Ok(name.as_str()),
        _ => Err(ScriptError::MissingArgument { line, directive, expected }),
    }
}

fn unknown(line: usize, kind: &'static str, name: &str) -> ScriptError {
    ScriptError::UnknownName { line, kind, name: name.to_owned() }
}
