use std::fmt;

use aws_config::SdkConfig;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::Client as StsClient;
use aws_smithy_types::{DateTime, date_time::Format};
use log::info;

use crate::error::{Error, Result};

/// Long-term access key pair of the resolved profile.
#[derive(Clone, PartialEq, Eq)]
pub struct BaseCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl BaseCredentials {
    pub fn entries(&self, region: Option<&str>) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("aws_access_key_id", self.access_key_id.clone()),
            ("aws_secret_access_key", self.secret_access_key.clone()),
        ];
        if let Some(region) = region {
            entries.push(("region", region.to_string()));
        }
        entries
    }
}

impl fmt::Debug for BaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Temporary credentials returned by `GetSessionToken`.
#[derive(Clone)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl SessionCredentials {
    pub fn expiration(&self) -> String {
        self.expiration
            .fmt(Format::DateTime)
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Keys written to the `default` profile. `aws_security_token` is the
    /// legacy name some older SDKs still read.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("aws_access_key_id", self.access_key_id.clone()),
            ("aws_secret_access_key", self.secret_access_key.clone()),
            ("aws_session_token", self.session_token.clone()),
            ("aws_security_token", self.session_token.clone()),
            ("expiration", self.expiration()),
        ]
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration())
            .finish()
    }
}

/// Where the updater gets its credentials from.
pub trait CredentialSource {
    /// Serial number of the caller's first registered MFA device.
    async fn mfa_serial(&self) -> Result<String>;

    async fn session_token(
        &self,
        serial_number: &str,
        code: &str,
        duration: u32,
    ) -> Result<SessionCredentials>;

    /// The long-term credentials the source itself is signing with.
    async fn base_credentials(&self) -> Result<BaseCredentials>;

    fn region(&self) -> Option<String>;
}

pub struct AwsCredentialSource {
    profile: String,
    config: SdkConfig,
    iam: IamClient,
    sts: StsClient,
}

impl AwsCredentialSource {
    pub fn new(profile: &str, config: SdkConfig) -> Self {
        Self {
            profile: profile.to_string(),
            iam: IamClient::new(&config),
            sts: StsClient::new(&config),
            config,
        }
    }
}

impl CredentialSource for AwsCredentialSource {
    async fn mfa_serial(&self) -> Result<String> {
        let output = self
            .iam
            .list_mfa_devices()
            .send()
            .await
            .map_err(|e| Error::from_sdk("ListMFADevices", e))?;

        let serial = output
            .mfa_devices()
            .first()
            .map(|device| device.serial_number().to_string())
            .ok_or(Error::NoMfaDevice)?;

        info!("Using MFA device {serial}");
        Ok(serial)
    }

    async fn session_token(
        &self,
        serial_number: &str,
        code: &str,
        duration: u32,
    ) -> Result<SessionCredentials> {
        let output = self
            .sts
            .get_session_token()
            .duration_seconds(duration as i32)
            .serial_number(serial_number)
            .token_code(code)
            .send()
            .await
            .map_err(|e| Error::from_sdk("GetSessionToken", e))?;

        let credentials = output.credentials().ok_or_else(|| Error::Rejected {
            operation: "GetSessionToken",
            message: "no credentials returned".to_string(),
        })?;

        Ok(SessionCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: *credentials.expiration(),
        })
    }

    async fn base_credentials(&self) -> Result<BaseCredentials> {
        let provider = self
            .config
            .credentials_provider()
            .ok_or_else(|| Error::CredentialsNotLoaded {
                profile: self.profile.clone(),
                message: "no credentials provider configured".to_string(),
            })?;

        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| Error::from_credentials(&self.profile, e))?;

        Ok(BaseCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
        })
    }

    fn region(&self) -> Option<String> {
        self.config.region().map(|r| r.to_string())
    }
}
