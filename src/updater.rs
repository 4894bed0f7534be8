//! MFA credential refresh.
//!
//! A run is one straight line:
//!
//! 1. Resolve which profile holds the long-term credentials (`[__cache-default]`
//!    if an earlier run created it, `[default]` otherwise)
//! 2. Look up the caller's MFA device
//! 3. Exchange the MFA code for a session token
//! 4. Read the long-term credentials the request was signed with
//! 5. Preserve them in `[__cache-default]` if it does not exist yet
//! 6. Write the session credentials to `[default]`
//!
//! Steps 5 and 6 are applied to the in-memory document and saved with a
//! single atomic replace, so any failure leaves the file exactly as it was.

use std::path::PathBuf;

use log::{info, warn};

use crate::{
    cli::AuthArgs,
    credentials::CredentialSource,
    error::Result,
    profile::{BaseProfile, CACHE_PROFILE, CredentialsFile, DEFAULT_PROFILE},
};

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub profile: BaseProfile,
    pub cache_created: bool,
    pub expiration: String,
}

/// Refreshes the `[default]` profile of one credentials file.
pub struct AwsMfaUpdater {
    file: CredentialsFile,
    profile: BaseProfile,
    duration: u32,
}

impl AwsMfaUpdater {
    /// Loads the credentials file and resolves the base profile.
    ///
    /// Everything that can be checked locally is checked here, before any
    /// network call: the file exists, parses, and has a usable profile.
    pub async fn new(path: Option<PathBuf>, duration: u32) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => CredentialsFile::default_path()?,
        };

        let file = CredentialsFile::load(path).await?;
        let profile = file.resolve_base_profile()?;
        info!(
            "Using [{}] from {}",
            profile.name(),
            file.path().display()
        );

        Ok(Self {
            file,
            profile,
            duration,
        })
    }

    pub fn profile(&self) -> BaseProfile {
        self.profile
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Runs steps 2 to 6 against `source`.
    ///
    /// The cache profile is only ever inserted, never updated, so the
    /// long-term keys captured on the first run survive every later one.
    /// The `[default]` credential keys are always replaced together.
    pub async fn update_credentials<S: CredentialSource>(
        mut self,
        source: &S,
        args: &AuthArgs,
    ) -> Result<Summary> {
        if !args.looks_like_totp() {
            warn!("MFA code is not 6 digits, sending it anyway");
        }

        info!("Fetching credentials - Duration: {}s", self.duration);

        let serial = source.mfa_serial().await?;
        let session = source
            .session_token(&serial, &args.code, self.duration)
            .await?;
        let base = source.base_credentials().await?;

        let cache_created = !self.profile.is_cached()
            && self
                .file
                .insert_profile(CACHE_PROFILE, &base.entries(source.region().as_deref()));
        if cache_created {
            info!("Created cache profile [{CACHE_PROFILE}]");
        }

        self.file.set_profile(DEFAULT_PROFILE, &session.entries());
        self.file.save()?;

        let expiration = session.expiration();
        info!("Success! Credentials expire at: {expiration}");

        Ok(Summary {
            profile: self.profile,
            cache_created,
            expiration,
        })
    }
}
