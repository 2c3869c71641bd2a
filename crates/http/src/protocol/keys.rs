//! Well-known environment keys.
//!
//! Keys without a dot are CGI-style request metadata and always carry strings.
//! Keys in the `lack.` namespace carry the typed values of the convention;
//! any other dotted key belongs to an extension.

pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
pub const PATH_INFO: &str = "PATH_INFO";
pub const QUERY_STRING: &str = "QUERY_STRING";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";

pub const HTTP_HOST: &str = "HTTP_HOST";
pub const HTTP_CONTENT_TYPE: &str = "HTTP_CONTENT_TYPE";
pub const HTTP_CONTENT_LENGTH: &str = "HTTP_CONTENT_LENGTH";

pub const LACK_VERSION: &str = "lack.version";
pub const LACK_INPUT: &str = "lack.input";
pub const LACK_ERRORS: &str = "lack.errors";
pub const LACK_MULTITHREAD: &str = "lack.multithread";
pub const LACK_MULTIPROCESS: &str = "lack.multiprocess";
pub const LACK_RUN_ONCE: &str = "lack.run_once";
pub const LACK_URL_SCHEME: &str = "lack.url_scheme";
pub const LACK_SESSION: &str = "lack.session";
pub const LACK_LOGGER: &str = "lack.logger";
pub const LACK_HIJACK_P: &str = "lack.hijack?";
pub const LACK_HIJACK: &str = "lack.hijack";

/// The convention version carried in [`LACK_VERSION`].
pub const VERSION: (u32, u32) = (1, 3);

/// Keys every environment must contain, besides [`SCRIPT_NAME`] and
/// [`PATH_INFO`] which are checked as a pair.
pub const REQUIRED: [&str; 7] =
    [REQUEST_METHOD, SERVER_NAME, SERVER_PORT, QUERY_STRING, LACK_VERSION, LACK_INPUT, LACK_ERRORS];
