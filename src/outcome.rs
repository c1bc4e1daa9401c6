use std::fmt;

/// Which stage of the pipeline produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream answered with a non-success status or could not be reached.
    Transport,
    /// Upstream answered successfully with a blank body.
    EmptyRecord,
    /// The request itself was unusable (bad identifier, blank identity).
    InvalidRequest,
    /// The helper process could not be reached or the channel broke.
    Channel,
    /// The helper replied with a non-success status.
    HelperRejected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::EmptyRecord => write!(f, "empty_record"),
            FailureKind::InvalidRequest => write!(f, "invalid_request"),
            FailureKind::Channel => write!(f, "channel"),
            FailureKind::HelperRejected => write!(f, "helper_rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

/// Terminal result of one export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

impl Outcome {
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        Outcome::Failure(Failure {
            kind,
            reason: reason.into(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(failure) => Some(&failure.reason),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(failure) => Some(failure.kind),
        }
    }
}
