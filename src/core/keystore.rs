use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_DIR: &str = ".insightminer";
const CREDENTIALS_FILE: &str = "credentials.json";

pub const YOUTUBE_KEY_NAME: &str = "YOUTUBE_API_KEY";
pub const GEMINI_KEY_NAME: &str = "GEMINI_API_KEY";

/// An opaque API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank input is treated as no key at all.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{head}…")
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "YOUTUBE_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<ApiKey>,
    #[serde(rename = "GEMINI_API_KEY", default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ApiKey>,
}

impl Credentials {
    pub fn new(youtube: Option<ApiKey>, gemini: Option<ApiKey>) -> Self {
        Self { youtube, gemini }
    }

    pub fn youtube(&self) -> Result<&ApiKey> {
        self.youtube.as_ref().ok_or_else(|| {
            Error::configuration(format!("{YOUTUBE_KEY_NAME} is not set"))
        })
    }

    pub fn gemini(&self) -> Result<&ApiKey> {
        self.gemini
            .as_ref()
            .ok_or_else(|| Error::configuration(format!("{GEMINI_KEY_NAME} is not set")))
    }

    /// Fill absent keys from the process environment.
    pub fn with_env_fallback(mut self) -> Self {
        if self.youtube.is_none() {
            self.youtube = env::var(YOUTUBE_KEY_NAME).ok().and_then(ApiKey::new);
        }
        if self.gemini.is_none() {
            self.gemini = env::var(GEMINI_KEY_NAME).ok().and_then(ApiKey::new);
        }
        self
    }
}

/// Credentials file inside a private config directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure_directory(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    pub fn load(&self) -> Result<Credentials> {
        let path = self.path();
        if !path.exists() {
            return Ok(Credentials::default());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Credentials::default());
        }

        let raw: RawCredentials = serde_json::from_str(&content)?;
        let credentials = Credentials {
            youtube: raw.youtube.and_then(ApiKey::new),
            gemini: raw.gemini.and_then(ApiKey::new),
        };
        debug!(
            youtube = credentials.youtube.is_some(),
            gemini = credentials.gemini.is_some(),
            "loaded credentials"
        );
        Ok(credentials)
    }

    pub fn save(&self, credentials: &Credentials) -> Result<PathBuf> {
        ensure_directory(&self.dir)?;
        let path = self.path();
        let content = serde_json::to_string_pretty(credentials)?;
        fs::write(&path, content)?;
        restrict_file(&path)?;
        debug!(path = %path.display(), "saved credentials");
        Ok(path)
    }
}

// Read as plain strings so blank entries can be dropped.
#[derive(Deserialize)]
struct RawCredentials {
    #[serde(rename = "YOUTUBE_API_KEY", default)]
    youtube: Option<String>,
    #[serde(rename = "GEMINI_API_KEY", default)]
    gemini: Option<String>,
}

fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o777 != 0o700 {
            permissions.set_mode(0o700);
            fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}

fn restrict_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!(
            "insightminer-keystore-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = KeyStore::open(scratch_dir("empty")).unwrap();
        assert_eq!(store.load().unwrap(), Credentials::default());
    }

    #[test]
    fn save_then_load() {
        let store = KeyStore::open(scratch_dir("roundtrip")).unwrap();
        let creds = Credentials::new(ApiKey::new("yt-key"), ApiKey::new("gm-key"));
        store.save(&creds).unwrap();

        let raw = fs::read_to_string(store.dir().join(CREDENTIALS_FILE)).unwrap();
        assert!(raw.contains("YOUTUBE_API_KEY"));
        assert!(raw.contains("GEMINI_API_KEY"));

        assert_eq!(store.load().unwrap(), creds);
    }

    #[test]
    fn blank_entries_are_absent() {
        let store = KeyStore::open(scratch_dir("blank")).unwrap();
        fs::write(
            store.dir().join(CREDENTIALS_FILE),
            r#"{"YOUTUBE_API_KEY": "  ", "GEMINI_API_KEY": "abc"}"#,
        )
        .unwrap();

        let creds = store.load().unwrap();
        assert!(creds.youtube.is_none());
        assert_eq!(creds.gemini().unwrap().as_str(), "abc");
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let creds = Credentials::default();
        assert!(creds.youtube().unwrap_err().is_configuration());
        assert!(creds.gemini().unwrap_err().is_configuration());
    }

    #[test]
    fn debug_and_mask_hide_secret() {
        let key = ApiKey::new("AIzaSecretValue").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert_eq!(key.masked(), "AIza…");
    }

    #[cfg(unix)]
    #[test]
    fn directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let store = KeyStore::open(scratch_dir("perms")).unwrap();
        let mode = fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
