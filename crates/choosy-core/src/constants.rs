use chrono::Duration;

/// Path of the credential-issuing endpoint on the backend.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Subtracted from `expires_in` when an access token is saved, so a token is
/// dropped before the backend stops honouring it.
pub const ACCESS_EXPIRY_MARGIN: Duration = Duration::minutes(5);

/// The backend does not report a refresh-token lifetime; it issues 7-day tokens.
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(7);

pub const DEFAULT_NAMESPACE: &str = "default";

pub mod storage_keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const ACCESS_EXPIRES_AT: &str = "token_expires_at";
    pub const REFRESH_EXPIRES_AT: &str = "refresh_expires_at";

    pub const ALL: [&str; 4] = [
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        ACCESS_EXPIRES_AT,
        REFRESH_EXPIRES_AT,
    ];
}
