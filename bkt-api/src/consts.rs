//! Constants for the bkt-api client

/// Base URL for the Bitbucket Cloud REST API
pub const API_BASE_URL: &str = "https://api.bitbucket.org/2.0/";

/// OAuth2 token endpoint for Bitbucket Cloud
pub const TOKEN_ENDPOINT_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// User-Agent header value for the API client
pub const USER_AGENT: &str = concat!("bkt/", env!("CARGO_PKG_VERSION"));

/// Accept header value for JSON resources
pub const ACCEPT: &str = "application/json";

/// Seconds subtracted from the server-declared expiry before a refresh is due
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Key of the items array in a paginated response
pub const PAGE_VALUES_KEY: &str = "values";

/// Key of the next page link in a paginated response
pub const PAGE_NEXT_KEY: &str = "next";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "BKT_API_BASE";

/// Environment variable overriding the token endpoint URL
pub const ENV_TOKEN_ENDPOINT: &str = "BKT_TOKEN_ENDPOINT";

/// Environment variable supplying the OAuth2 client identifier
pub const ENV_CLIENT_ID: &str = "BKT_CLIENT_ID";

/// Environment variable supplying the OAuth2 client secret
pub const ENV_CLIENT_SECRET: &str = "BKT_CLIENT_SECRET";
