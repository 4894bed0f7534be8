//! The AWS shared credentials file.
//!
//! The file is read once, resolved, edited in memory and replaced atomically,
//! so a run never leaves a half-written profile behind.
//!
//! ```ini
//! [default]
//! aws_access_key_id=ASIA...           # temporary, rewritten on every run
//! aws_secret_access_key=...
//! aws_session_token=...
//! aws_security_token=...
//! expiration=2026-10-20T06:00:00Z
//!
//! [__cache-default]
//! aws_access_key_id=AKIA...           # long-term, written once
//! aws_secret_access_key=...
//! region=us-east-1
//! ```

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use configparser::ini::Ini;
use log::debug;
use tempfile::NamedTempFile;
use tokio::fs;

use crate::error::{Error, Result};

/// Profile that receives the session credentials.
pub const DEFAULT_PROFILE: &str = "default";

/// Profile that keeps the long-term credentials once `default` is overwritten.
pub const CACHE_PROFILE: &str = "__cache-default";

/// Bucket for keys that appear before the first section header. Not a valid
/// profile name, so it can never collide with `[default]`.
const TOP_LEVEL: &str = "\u{0}top-level";

/// The profile that supplies long-term credentials for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseProfile {
    /// Credentials preserved by an earlier run.
    Cache,
    /// First run: `default` still holds the long-term keys.
    Default,
}

impl BaseProfile {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cache => CACHE_PROFILE,
            Self::Default => DEFAULT_PROFILE,
        }
    }

    pub fn is_cached(self) -> bool {
        self == Self::Cache
    }
}

pub struct CredentialsFile {
    path: PathBuf,
    ini: Ini,
}

impl CredentialsFile {
    /// `~/.aws/credentials`, the location the AWS CLI uses.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|d| d.join(".aws").join("credentials"))
            .ok_or(Error::NoHomeDirectory)
    }

    pub async fn load(path: PathBuf) -> Result<Self> {
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CredentialsFileMissing(path));
            }
            Err(source) => return Err(Error::Read { path, source }),
        };
        Self::parse(path, contents)
    }

    pub fn parse(path: PathBuf, contents: String) -> Result<Self> {
        let mut defaults = Ini::new_cs().defaults();
        defaults.default_section = TOP_LEVEL.to_string();
        defaults.delimiters = vec!['='];
        // `;` and `#` are legal inside values such as `credential_process`
        defaults.inline_comment_symbols = Some(vec![]);

        let mut ini = Ini::new_from_defaults(defaults);
        if let Err(reason) = ini.read(contents) {
            return Err(Error::MalformedCredentialsFile { path, reason });
        }

        Ok(Self { path, ini })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_profile(&self, profile: &str) -> bool {
        self.ini.sections().iter().any(|s| s == profile)
    }

    pub fn get(&self, profile: &str, key: &str) -> Option<String> {
        self.ini.get(profile, key)
    }

    /// Picks the profile holding the long-term credentials.
    ///
    /// Section names are compared exactly. A cache profile anywhere in the
    /// file wins over `default`; with neither present there is nothing to
    /// bootstrap from.
    pub fn resolve_base_profile(&self) -> Result<BaseProfile> {
        let profile = if self.has_profile(CACHE_PROFILE) {
            BaseProfile::Cache
        } else if self.has_profile(DEFAULT_PROFILE) {
            BaseProfile::Default
        } else {
            return Err(Error::NoDefaultProfile(self.path.clone()));
        };

        // A `default` that already carries a session token is the output of
        // an earlier run whose cache profile has since been removed.
        if profile == BaseProfile::Default && self.get(DEFAULT_PROFILE, "aws_session_token").is_some()
        {
            return Err(Error::ProfileHoldsSessionCredentials(
                DEFAULT_PROFILE.to_string(),
            ));
        }

        Ok(profile)
    }

    /// Writes `entries` into `profile` unless the profile already exists.
    /// Returns whether anything was written.
    pub fn insert_profile(&mut self, profile: &str, entries: &[(&str, String)]) -> bool {
        if self.has_profile(profile) {
            return false;
        }
        self.set_profile(profile, entries);
        true
    }

    /// Sets every key in `entries` on `profile`, creating the section if
    /// needed. Other keys of the section are kept.
    pub fn set_profile(&mut self, profile: &str, entries: &[(&str, String)]) {
        for (key, value) in entries {
            self.ini.set(profile, key, Some(value.clone()));
        }
    }

    /// Replaces the file on disk with the in-memory document.
    ///
    /// The content goes to a temporary file in the same directory which is
    /// then renamed over the original, so readers see either the old or the
    /// new file and never a mix of both.
    pub fn save(&self) -> Result<()> {
        let write_err = |source: std::io::Error| Error::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.ini.writes().as_bytes())
            .map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }

        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}
