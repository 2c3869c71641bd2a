//! Checks on the environment handed to an application.

use lack_http::protocol::{keys, Env, Value};

use super::LintError;
use crate::utils::ensure;

const FLAGS: [&str; 3] = [keys::LACK_MULTITHREAD, keys::LACK_MULTIPROCESS, keys::LACK_RUN_ONCE];

pub(crate) fn check_env(env: &Env) -> Result<(), LintError> {
    for key in keys::REQUIRED {
        ensure!(env.contains_key(key), LintError::new(format!("env missing required key {key}")));
    }
    check_path_keys_present(env)?;

    for (key, value) in env.iter() {
        if !key.contains('.') {
            ensure!(
                matches!(value, Value::Str(_)),
                LintError::new(format!("env variable {key} has non-string value {value:?}"))
            );
        }
    }

    check_version(env)?;
    check_url_scheme(env)?;
    check_flags(env)?;
    check_session(env)?;
    check_logger(env)?;
    check_hijack(env)?;

    for key in [keys::HTTP_CONTENT_TYPE, keys::HTTP_CONTENT_LENGTH] {
        let expected = key.trim_start_matches("HTTP_");
        ensure!(!env.contains_key(key), LintError::new(format!("env contains {key}, {expected} expected")));
    }

    check_request_method(env)?;
    check_path_keys(env)?;
    check_content_length(env)?;

    check_input(env)?;
    check_errors(env)
}

fn check_path_keys_present(env: &Env) -> Result<(), LintError> {
    let script_name = env.contains_key(keys::SCRIPT_NAME);
    let path_info = env.contains_key(keys::PATH_INFO);
    ensure!(
        script_name || path_info,
        LintError::new("One of SCRIPT_NAME or PATH_INFO must be set (make PATH_INFO '/' if SCRIPT_NAME is empty)")
    );
    for (present, key) in [(script_name, keys::SCRIPT_NAME), (path_info, keys::PATH_INFO)] {
        ensure!(present, LintError::new(format!("env missing required key {key}")));
    }
    Ok(())
}

fn check_version(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_VERSION) {
        Some(Value::Version(..)) => Ok(()),
        Some(other) => {
            Err(LintError::new(format!("{} must be an Array, was {}", keys::LACK_VERSION, other.kind_name())))
        }
        None => Err(LintError::new(format!("env missing required key {}", keys::LACK_VERSION))),
    }
}

fn check_url_scheme(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_URL_SCHEME) {
        None => Ok(()),
        Some(Value::Str(scheme)) if scheme == "http" || scheme == "https" => Ok(()),
        Some(other) => Err(LintError::new(format!("url_scheme unknown: {other:?}"))),
    }
}

fn check_flags(env: &Env) -> Result<(), LintError> {
    for key in FLAGS {
        if let Some(value) = env.get(key) {
            ensure!(
                matches!(value, Value::Bool(_)),
                LintError::new(format!("{key} must be true or false, was {value:?}"))
            );
        }
    }
    Ok(())
}

fn check_session(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_SESSION) {
        None | Some(Value::Session(_)) => Ok(()),
        Some(other) => Err(LintError::new(format!("session {other:?} must respond to store and []="))),
    }
}

fn check_logger(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_LOGGER) {
        None | Some(Value::Logger(_)) => Ok(()),
        Some(other) => Err(LintError::new(format!("logger {other:?} must respond to info"))),
    }
}

fn check_hijack(env: &Env) -> Result<(), LintError> {
    let hijackable = match env.get(keys::LACK_HIJACK_P) {
        None => false,
        Some(Value::Bool(hijackable)) => *hijackable,
        Some(other) => {
            return Err(LintError::new(format!("{} must be true or false, was {other:?}", keys::LACK_HIJACK_P)));
        }
    };

    if hijackable {
        ensure!(
            matches!(env.get(keys::LACK_HIJACK), Some(Value::Hijack(_))),
            LintError::new(format!("{} must respond to call", keys::LACK_HIJACK))
        );
    }
    Ok(())
}

fn is_method_token(method: &str) -> bool {
    !method.is_empty() && method.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

fn check_request_method(env: &Env) -> Result<(), LintError> {
    let method = env.request_method();
    ensure!(is_method_token(method), LintError::new(format!("REQUEST_METHOD unknown: {method:?}")));
    Ok(())
}

fn check_path_keys(env: &Env) -> Result<(), LintError> {
    let script_name = env.script_name();
    let path_info = env.path_info();

    for (key, value) in [(keys::SCRIPT_NAME, script_name), (keys::PATH_INFO, path_info)] {
        ensure!(value.is_empty() || value.starts_with('/'), LintError::new(format!("{key} must start with /")));
    }
    ensure!(script_name != "/", LintError::new("SCRIPT_NAME cannot be '/', make it '' and PATH_INFO '/'"));
    ensure!(
        !(script_name.is_empty() && path_info.is_empty()),
        LintError::new("One of SCRIPT_NAME or PATH_INFO must be set (make PATH_INFO '/' if SCRIPT_NAME is empty)")
    );
    Ok(())
}

fn check_content_length(env: &Env) -> Result<(), LintError> {
    if let Some(length) = env.get_str(keys::CONTENT_LENGTH) {
        ensure!(
            !length.is_empty() && length.bytes().all(|b| b.is_ascii_digit()),
            LintError::new(format!("Invalid CONTENT_LENGTH: {length:?}"))
        );
    }
    Ok(())
}

fn check_input(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_INPUT) {
        Some(Value::Input(_)) => Ok(()),
        Some(other) => Err(LintError::new(format!("{} {other:?} does not respond to #gets", keys::LACK_INPUT))),
        None => Err(LintError::new(format!("env missing required key {}", keys::LACK_INPUT))),
    }
}

fn check_errors(env: &Env) -> Result<(), LintError> {
    match env.get(keys::LACK_ERRORS) {
        Some(Value::Errors(_)) => Ok(()),
        Some(other) => Err(LintError::new(format!("{} {other:?} does not respond to #puts", keys::LACK_ERRORS))),
        None => Err(LintError::new(format!("env missing required key {}", keys::LACK_ERRORS))),
    }
}
