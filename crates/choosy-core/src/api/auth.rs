use serde::{Deserialize, Serialize};

use crate::constants::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN};

/// A grant sent form-encoded to the credential endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode { code: String },
    RefreshToken { refresh_token: String },
}

impl TokenGrant {
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => GRANT_AUTHORIZATION_CODE,
            Self::RefreshToken { .. } => GRANT_REFRESH_TOKEN,
        }
    }

    #[must_use]
    pub fn form_pairs(&self, client_id: Option<&str>) -> Vec<(String, String)> {
        let mut pairs = vec![("grant_type".to_string(), self.grant_type().to_string())];
        match self {
            Self::AuthorizationCode { code } => {
                pairs.push(("code".to_string(), code.clone()));
            }
            Self::RefreshToken { refresh_token } => {
                pairs.push(("refresh_token".to_string(), refresh_token.clone()));
            }
        }
        if let Some(client_id) = client_id {
            pairs.push(("client_id".to_string(), client_id.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
