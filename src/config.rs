//! AWS SDK configuration bound to a single profile of the credentials file.

use std::path::Path;

use aws_config::{BehaviorVersion, Region, SdkConfig, retry::RetryConfig};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use log::{debug, info};

/// STS needs a region and IAM is global, so any region will do when none is
/// configured.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Attempts per call, including the first. Transient failures are retried
/// with exponential backoff by the SDK.
const MAX_ATTEMPTS: u32 = 3;

/// Loads the SDK configuration for `profile`.
///
/// The loader reads `credentials_path` (the same file the updater edits)
/// alongside the default `~/.aws/config`. Region priority is the explicit
/// override, then the usual environment/profile chain, then
/// [`DEFAULT_AWS_REGION`].
pub async fn load(profile: &str, credentials_path: &Path, region: Option<String>) -> SdkConfig {
    let files = EnvConfigFiles::builder()
        .include_default_config_file(true)
        .with_file(EnvConfigFileKind::Credentials, credentials_path)
        .build();

    let loader = || {
        aws_config::defaults(BehaviorVersion::latest())
            .profile_files(files.clone())
            .profile_name(profile)
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
    };
    debug!("Retrying transient failures up to {MAX_ATTEMPTS} attempts");

    let config = match region {
        Some(region) => loader().region(Region::new(region)).load().await,
        None => loader().load().await,
    };

    match config.region() {
        Some(region) => {
            info!("Using region: {region}");
            config
        }
        None => {
            info!("No region configured, using default {DEFAULT_AWS_REGION}");
            loader()
                .region(Region::new(DEFAULT_AWS_REGION))
                .load()
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The directory is returned so the file outlives lazy credential loading.
    async fn load_from(contents: &str, region: Option<&str>) -> (tempfile::TempDir, SdkConfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, contents).unwrap();
        let config = load("default", &path, region.map(str::to_string)).await;
        (dir, config)
    }

    #[tokio::test]
    async fn test_explicit_region_wins() {
        let (_dir, config) = load_from(
            "[default]\naws_access_key_id=AKIA1\naws_secret_access_key=s\nregion=eu-west-1\n",
            Some("ap-northeast-1"),
        )
        .await;
        assert_eq!(config.region().unwrap().as_ref(), "ap-northeast-1");
    }

    #[tokio::test]
    async fn test_credentials_come_from_the_given_file() {
        use aws_credential_types::provider::ProvideCredentials;

        let (_dir, config) = load_from(
            "[default]\naws_access_key_id=AKIAFROMFILE\naws_secret_access_key=s\n",
            Some("us-west-2"),
        )
        .await;

        let credentials = config
            .credentials_provider()
            .unwrap()
            .provide_credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id(), "AKIAFROMFILE");
    }
}
