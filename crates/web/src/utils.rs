//! Helper macros used across the crate.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// Like `assert!`, but produces an `Err` instead of panicking, which is what
/// the conformance checks need: a violation is reported to the caller as a
/// regular error value.
///
/// ```ignore
/// ensure!(status >= 100, LintError::new("Status must be >=100 seen as integer"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
