//! Error taxonomy for a credential refresh.
//!
//! Every failure belongs to exactly one [`ErrorKind`]. The kind decides the
//! process exit status and whether running the command again can help.

use std::{fmt, path::PathBuf, process::ExitCode};

use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Service error codes IAM and STS use when they shed load.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "ServiceUnavailable",
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not determine home directory; pass --credentials-path")]
    NoHomeDirectory,

    #[error("Credentials file not found: {}", .0.display())]
    CredentialsFileMissing(PathBuf),

    #[error("Failed to read credentials file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed credentials file {}: {reason}", .path.display())]
    MalformedCredentialsFile { path: PathBuf, reason: String },

    #[error("No [default] profile in {}. Create one with your long-term access keys, e.g. `aws configure`", .0.display())]
    NoDefaultProfile(PathBuf),

    #[error(
        "Profile [{0}] already holds session credentials and no cache profile exists; restore your long-term access keys in [{0}]"
    )]
    ProfileHoldsSessionCredentials(String),

    #[error("Could not load credentials for profile [{profile}]: {message}")]
    CredentialsNotLoaded { profile: String, message: String },

    #[error("No MFA device is registered for the calling IAM identity")]
    NoMfaDevice,

    #[error("{operation} was rejected: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} failed, retry later: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to write credentials file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Auth,
    Transient,
    Write,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Exit status, following the sysexits(3) conventions.
    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(match self {
            Self::Config => 78,
            Self::Auth => 77,
            Self::Transient => 75,
            Self::Write => 74,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "configuration error",
            Self::Auth => "authentication error",
            Self::Transient => "network error",
            Self::Write => "write error",
        })
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoHomeDirectory
            | Self::CredentialsFileMissing(_)
            | Self::Read { .. }
            | Self::MalformedCredentialsFile { .. }
            | Self::NoDefaultProfile(_)
            | Self::ProfileHoldsSessionCredentials(_)
            | Self::CredentialsNotLoaded { .. } => ErrorKind::Config,
            Self::NoMfaDevice | Self::Rejected { .. } => ErrorKind::Auth,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Write { .. } => ErrorKind::Write,
        }
    }

    /// Classifies a failed IAM or STS call.
    ///
    /// The SDK has already retried transient failures by the time an error
    /// reaches us, so anything still timing out, failing to dispatch, being
    /// throttled or answered with a 5xx is reported as transient. Any other
    /// response from the service is a rejection.
    pub fn from_sdk<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let transient = match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
                true
            }
            SdkError::ServiceError(service) => {
                service.raw().status().as_u16() >= 500
                    || service
                        .err()
                        .code()
                        .is_some_and(|code| THROTTLING_CODES.contains(&code))
            }
            _ => false,
        };
        let message = DisplayErrorContext(&err).to_string();

        if transient {
            Self::Transient { operation, message }
        } else {
            Self::Rejected { operation, message }
        }
    }

    pub fn from_credentials(profile: &str, err: CredentialsError) -> Self {
        let message = DisplayErrorContext(&err).to_string();
        match err {
            CredentialsError::ProviderTimedOut(_) => Self::Transient {
                operation: "Credential resolution",
                message,
            },
            _ => Self::CredentialsNotLoaded {
                profile: profile.to_string(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::NoDefaultProfile("c".into()).kind(), ErrorKind::Config);
        assert_eq!(Error::NoMfaDevice.kind(), ErrorKind::Auth);
        assert_eq!(
            Error::Transient {
                operation: "GetSessionToken",
                message: "timed out".into()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            Error::Write {
                path: "c".into(),
                source: std::io::Error::other("disk full"),
            }
            .kind(),
            ErrorKind::Write
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ErrorKind::Transient.is_retryable());
        assert!(!ErrorKind::Config.is_retryable());
        assert!(!ErrorKind::Auth.is_retryable());
        assert!(!ErrorKind::Write.is_retryable());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            ErrorKind::Config,
            ErrorKind::Auth,
            ErrorKind::Transient,
            ErrorKind::Write,
        ]
        .map(|kind| format!("{:?}", kind.exit_code()));

        for (i, code) in codes.iter().enumerate() {
            assert!(!codes[i + 1..].contains(code));
        }
    }

    fn service_error(status: u16, code: &str) -> Error {
        use aws_sdk_sts::{error::ErrorMetadata, operation::get_session_token::GetSessionTokenError};
        use aws_smithy_runtime_api::http::StatusCode;
        use aws_smithy_types::body::SdkBody;

        let err = GetSessionTokenError::generic(ErrorMetadata::builder().code(code).build());
        let raw = HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
        Error::from_sdk("GetSessionToken", SdkError::service_error(err, raw))
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert_eq!(service_error(500, "InternalFailure").kind(), ErrorKind::Transient);
        assert_eq!(service_error(503, "ServiceUnavailable").kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_throttling_is_transient() {
        assert_eq!(service_error(400, "Throttling").kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_bad_code_is_rejected() {
        let err = service_error(403, "AccessDenied");
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(matches!(err, Error::Rejected { operation: "GetSessionToken", .. }));
    }

    #[test]
    fn test_provider_timeout_is_transient() {
        let err = Error::from_credentials(
            "default",
            CredentialsError::provider_timed_out(Duration::from_secs(5)),
        );
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_missing_credentials_is_config() {
        let err = Error::from_credentials("default", CredentialsError::not_loaded("no keys"));
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("[default]"));
    }
}
