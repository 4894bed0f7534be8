//! AWS MFA session refresher
//!
//! Exchanges an MFA code for temporary AWS credentials and stores them in the
//! `[default]` profile of the shared credentials file, keeping the long-term
//! keys in `[__cache-default]` for the next run.
//!
//! Exit status is 0 on success. Failures exit with a status that tells the
//! kinds apart: 78 configuration, 77 authentication, 75 network (worth
//! retrying), 74 writing the credentials file.

use std::process::ExitCode;

use clap::Parser;
use log::error;

mod cli;
mod config;
mod credentials;
mod error;
mod profile;
mod updater;

use cli::{AuthArgs, Cli, Command};
use credentials::AwsCredentialSource;
use updater::{AwsMfaUpdater, Summary};

#[tokio::main]
async fn main() -> ExitCode {
    // INFO by default so each step is visible; RUST_LOG overrides.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Cli {
        credentials_path,
        command,
    } = Cli::parse();

    let result = match command {
        Command::Auth(args) => authenticate(credentials_path, args).await,
    };

    match result {
        Ok(summary) => {
            println!(
                "\nAWS credentials saved to [{}] profile.",
                profile::DEFAULT_PROFILE
            );
            if summary.cache_created {
                println!(
                    "Long-term credentials of [{}] preserved in [{}].",
                    summary.profile.name(),
                    profile::CACHE_PROFILE
                );
            }
            println!("Credentials will expire at: {}", summary.expiration);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let kind = e.kind();
            error!("{kind}: {e}");
            if kind.is_retryable() {
                error!("This looks temporary; run the command again with a fresh code");
            }
            kind.exit_code()
        }
    }
}

async fn authenticate(
    credentials_path: Option<std::path::PathBuf>,
    args: AuthArgs,
) -> error::Result<Summary> {
    let updater = AwsMfaUpdater::new(credentials_path, args.duration).await?;

    let profile = updater.profile().name();
    let sdk_config = config::load(profile, updater.path(), args.region.clone()).await;
    let source = AwsCredentialSource::new(profile, sdk_config);

    updater.update_credentials(&source, &args).await
}
