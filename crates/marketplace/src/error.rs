use crate::workflow::WorkflowPhase;

pub type Result<T, E = MarketplaceError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// The request never produced a response (connect error, reset, timeout).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The server answered with a non-2xx status or an explicit failure payload.
    #[error("{}", rejection_text(.status, .message))]
    ServerRejection {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("invalid response payload: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("You are not logged into an Organization/workspace")]
    MissingSession,

    /// A response arrived after its selection was superseded and was dropped.
    #[error("response discarded: selection changed while the request was in flight")]
    StaleResponse,

    #[error("an install is already in progress")]
    InstallInProgress,

    #[error("cannot install while the workflow is {0}")]
    InvalidPhase(WorkflowPhase),

    #[error("no plugin selected")]
    NothingSelected,
}

fn rejection_text(status: &Option<u16>, message: &Option<String>) -> String {
    match (status, message.as_deref()) {
        (Some(status), Some(message)) => format!("server rejected request ({status}): {message}"),
        (Some(status), None) => format!("server rejected request ({status})"),
        (None, Some(message)) => format!("server rejected request: {message}"),
        (None, None) => "server rejected request".to_string(),
    }
}

impl MarketplaceError {
    /// Message supplied by the server, if any. Used verbatim in user-facing
    /// failure states.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::ServerRejection {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}

impl From<reqwest::Error> for MarketplaceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_timeout() {
            Self::NetworkFailure("request timed out".into())
        } else {
            Self::NetworkFailure(err.to_string())
        }
    }
}

impl From<url::ParseError> for MarketplaceError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
