//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// mfa-aws is a wrapper to facilitate MFA authentication for the AWS CLI.
///
/// Exchanges an MFA code for temporary session credentials and writes them to
/// the `[default]` profile. The long-term keys are kept in
/// `[__cache-default]` so the command can be run again once the session
/// expires.
#[derive(Debug, Parser)]
#[command(name = "mfa-aws", author, version, about)]
pub struct Cli {
    /// Path to AWS credentials file [default: ~/.aws/credentials]
    #[arg(long, global = true, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate using a MFA code.
    Auth(AuthArgs),
}

/// Everything one credential refresh needs.
#[derive(Debug, Clone, Args)]
pub struct AuthArgs {
    /// MFA code from your authenticator device
    #[arg(short, long)]
    pub code: String,

    /// Session duration in seconds (900-129600)
    #[arg(
        short,
        long,
        env = "AWS_SESSION_DURATION",
        default_value = "43200",
        value_parser = clap::value_parser!(u32).range(900..=129600)
    )]
    pub duration: u32,

    /// Region for the IAM and STS calls [default: profile region, else us-east-1]
    #[arg(short, long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl AuthArgs {
    /// Codes are passed through untouched, STS has the final word.
    pub fn looks_like_totp(&self) -> bool {
        self.code.len() == 6 && self.code.chars().all(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, error::ErrorKind};

    use super::*;

    fn auth(args: &[&str]) -> AuthArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Auth(auth) => auth,
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_auth_long_code() {
        assert_eq!(auth(&["mfa-aws", "auth", "--code", "123456"]).code, "123456");
    }

    #[test]
    fn test_auth_short_code() {
        assert_eq!(auth(&["mfa-aws", "auth", "-c", "654321"]).code, "654321");
    }

    #[test]
    fn test_code_is_required() {
        let err = Cli::try_parse_from(["mfa-aws", "auth"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["mfa-aws"]).is_err());
    }

    #[test]
    fn test_duration_bounds() {
        assert_eq!(
            auth(&["mfa-aws", "auth", "-c", "123456", "-d", "900"]).duration,
            900
        );
        let err = Cli::try_parse_from(["mfa-aws", "auth", "-c", "123456", "-d", "899"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_global_credentials_path() {
        let cli = Cli::try_parse_from([
            "mfa-aws",
            "auth",
            "-c",
            "123456",
            "--credentials-path",
            "/tmp/credentials",
        ])
        .unwrap();
        assert_eq!(cli.credentials_path, Some(PathBuf::from("/tmp/credentials")));
    }

    #[test]
    fn test_looks_like_totp() {
        assert!(auth(&["mfa-aws", "auth", "-c", "012345"]).looks_like_totp());
        assert!(!auth(&["mfa-aws", "auth", "-c", "12345"]).looks_like_totp());
        assert!(!auth(&["mfa-aws", "auth", "-c", "12345a"]).looks_like_totp());
    }
}
