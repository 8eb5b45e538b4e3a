/// Application name
pub const APP_NAME: &str = "Trustavo";

/// Lifetime of an identity, in hours. Everything it posts vanishes with it.
pub const IDENTITY_TTL_HOURS: i64 = 24;

/// Nickname bounds, in characters, measured after trimming
pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Signal and comment body bounds, in characters (inclusive)
pub const CONTENT_MIN_CHARS: usize = 1;
pub const CONTENT_MAX_CHARS: usize = 500;

/// Language assigned to an identity created without one
pub const DEFAULT_LANGUAGE: &str = "English";

/// Public base URL used when building share links
pub const DEFAULT_SHARE_BASE_URL: &str = "https://trustavo.com";

/// Default number of entries returned by trending queries
pub const DEFAULT_TRENDING_LIMIT: usize = 20;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Header naming the identity a request acts as
pub const IDENTITY_HEADER: &str = "x-trustavo-identity";
