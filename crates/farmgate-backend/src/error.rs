use farmgate_session::SessionError;

/// Errors that can occur talking to the portal's auth API.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The configuration can't produce a working client.
    #[error("invalid backend config: {0}")]
    InvalidConfig(String),

    /// The request never got a response (connect, timeout, TLS...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend refused the credentials.
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// The backend answered with a status we don't handle.
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: &'static str, status: u16 },

    /// The body wasn't the JSON we expected.
    #[error("invalid response from {endpoint}: {source}")]
    InvalidResponse {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The controller only distinguishes "credentials refused" from "backend
/// trouble".
impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::LoginRejected(message) => SessionError::AuthFailed(message),
            other => SessionError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_rejected_maps_to_auth_failed() {
        let err: SessionError = BackendError::LoginRejected("wrong password".into()).into();
        assert!(matches!(err, SessionError::AuthFailed(m) if m == "wrong password"));
    }

    #[test]
    fn test_unexpected_status_maps_to_backend_error() {
        let err: SessionError = BackendError::UnexpectedStatus {
            endpoint: "status",
            status: 502,
        }
        .into();
        match err {
            SessionError::Backend(message) => assert!(message.contains("502")),
            other => panic!("expected Backend, got {other:?}"),
        }
    }
}
