//! The per-request environment.
//!
//! An [`Env`] is created once per inbound request and handed down the whole
//! middleware chain by mutable reference. Middleware adds and rewrites keys in
//! place; nothing in the chain copies it.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::protocol::error::BoxError;
use crate::protocol::keys;
use crate::protocol::stream::{ErrorStream, InputStream, Logger};

/// Callback stored under [`keys::LACK_HIJACK`].
pub type HijackFn = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// A single environment value.
pub enum Value {
    /// The key is set but carries nothing.
    Nil,
    Str(String),
    Bool(bool),
    /// `(major, minor)` of the convention.
    Version(u32, u32),
    List(Vec<String>),
    Session(HashMap<String, String>),
    Input(Box<dyn InputStream>),
    Errors(Box<dyn ErrorStream>),
    Logger(Arc<dyn Logger>),
    Hijack(HijackFn),
    Extension(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Str(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Version(..) => "Version",
            Value::List(_) => "List",
            Value::Session(_) => "Session",
            Value::Input(_) => "Input",
            Value::Errors(_) => "Errors",
            Value::Logger(_) => "Logger",
            Value::Hijack(_) => "Hijack",
            Value::Extension(_) => "Extension",
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Downcasts an [`Value::Extension`] to a concrete type.
    pub fn downcast_extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Extension(ext) => ext.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Version(major, minor) => write!(f, "[{major}, {minor}]"),
            Value::List(list) => write!(f, "{list:?}"),
            Value::Session(session) => write!(f, "{session:?}"),
            other => write!(f, "#<{}>", other.kind_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::List(value)
    }
}

impl From<(u32, u32)> for Value {
    fn from((major, minor): (u32, u32)) -> Self {
        Value::Version(major, minor)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(value: HashMap<String, String>) -> Self {
        Value::Session(value)
    }
}

/// The request environment: a key/value map passed through the whole chain.
#[derive(Default)]
pub struct Env {
    entries: BTreeMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Returns the value of `key` when it is present and a string.
    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Inserts a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn request_method(&self) -> &str {
        self.get_str(keys::REQUEST_METHOD).unwrap_or_default()
    }

    pub fn script_name(&self) -> &str {
        self.get_str(keys::SCRIPT_NAME).unwrap_or_default()
    }

    pub fn path_info(&self) -> &str {
        self.get_str(keys::PATH_INFO).unwrap_or_default()
    }

    /// The request input stream, if one is installed.
    pub fn input_mut(&mut self) -> Option<&mut (dyn InputStream + 'static)> {
        match self.entries.get_mut(keys::LACK_INPUT) {
            Some(Value::Input(input)) => Some(input.as_mut()),
            _ => None,
        }
    }

    /// The error stream, if one is installed.
    pub fn errors_mut(&mut self) -> Option<&mut (dyn ErrorStream + 'static)> {
        match self.entries.get_mut(keys::LACK_ERRORS) {
            Some(Value::Errors(errors)) => Some(errors.as_mut()),
            _ => None,
        }
    }

    pub fn logger(&self) -> Option<&Arc<dyn Logger>> {
        match self.entries.get(keys::LACK_LOGGER) {
            Some(Value::Logger(logger)) => Some(logger),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut HashMap<String, String>> {
        match self.entries.get_mut(keys::LACK_SESSION) {
            Some(Value::Session(session)) => Some(session),
            _ => None,
        }
    }

    /// Rewrites `key` with `f` applied to the current value, leaving the key
    /// untouched when it is absent.
    pub fn replace_with<F>(&mut self, key: &str, f: F)
    where
        F: FnOnce(Value) -> Value,
    {
        if let Some(value) = self.entries.remove(key) {
            self.entries.insert(key.to_owned(), f(value));
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Env
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries }
    }
}

impl<K, V> Extend<(K, V)> for Env
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Env, Value};
    use crate::protocol::keys;
    use crate::protocol::stream::StringInput;

    #[test]
    fn test_set_and_get() {
        let mut env = Env::new();
        assert!(env.set(keys::PATH_INFO, "/foo").is_none());
        assert_eq!(env.path_info(), "/foo");

        let previous = env.set(keys::PATH_INFO, "/bar");
        assert_eq!(previous.as_ref().and_then(Value::as_str), Some("/foo"));
        assert_eq!(env.get_str(keys::PATH_INFO), Some("/bar"));
    }

    #[test]
    fn test_nil_is_not_absent() {
        let mut env = Env::new();
        env.set("FOO", Value::Nil);

        assert!(env.contains_key("FOO"));
        assert!(env.get_str("FOO").is_none());
        assert!(!env.contains_key("BAR"));
    }

    #[test]
    fn test_input_access() {
        let mut env = Env::new();
        assert!(env.input_mut().is_none());

        env.set(keys::LACK_INPUT, Value::Input(Box::new(StringInput::new("hello"))));
        let read = env.input_mut().unwrap().read(None, None).unwrap();
        assert_eq!(read.unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_replace_with() {
        let mut env: Env = [(keys::SCRIPT_NAME, "/a")].into_iter().collect();
        env.replace_with(keys::SCRIPT_NAME, |v| Value::Str(format!("{}/b", v.as_str().unwrap())));
        env.replace_with("MISSING", |_| Value::Nil);

        assert_eq!(env.script_name(), "/a/b");
        assert!(!env.contains_key("MISSING"));
    }

    #[test]
    fn test_debug_lists_keys() {
        let env: Env = [("A", "1"), ("lack.flag", "2")].into_iter().collect();
        let debug = format!("{env:?}");
        assert!(debug.contains("\"A\": \"1\""));
        assert!(debug.contains("lack.flag"));
    }
}
