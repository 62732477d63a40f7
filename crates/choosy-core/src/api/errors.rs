use serde::Deserialize;

pub const GENERIC_FAILURE_MESSAGE: &str = "request failed";

/// Error object returned by the backend on non-2xx responses. The token
/// endpoint uses the OAuth shape, the REST endpoints use `message` or `detail`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Most descriptive message available: `error_description`, then
    /// `message`, then `detail`.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        non_empty(self.error_description.as_deref())
            .or_else(|| non_empty(self.message.as_deref()))
            .or_else(|| match self.detail.as_ref()? {
                serde_json::Value::String(value) => non_empty(Some(value)),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
    }
}

/// Message for a failed response body, falling back to the generic text.
#[must_use]
pub fn describe_failure(body: &str) -> String {
    ErrorBody::parse(body)
        .describe()
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
