use thiserror::Error;

/// Which side of the wire a remote failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The API answered with `stat: fail`.
    Service { code: i64 },
    /// Transport, HTTP status, or response decoding failure.
    Unexpected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}{message}", kind_prefix(.kind))]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn service(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Service { code },
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Unexpected,
            message: message.into(),
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self.kind, RemoteErrorKind::Service { .. })
    }
}

fn kind_prefix(kind: &RemoteErrorKind) -> &'static str {
    match kind {
        RemoteErrorKind::Service { .. } => "Flickr error: ",
        RemoteErrorKind::Unexpected => "Unexpected Flickr error: ",
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::unexpected(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        Self::unexpected(format!("malformed response: {e}"))
    }
}
