//! Settings resolution for chatsync.
//!
//! Combines the optional TOML client configuration with command-line
//! overrides and the session credentials.

use anyhow::{Context, Result};
use std::path::Path;

use chat_client::{ClientConfig, Credential, Session};
use chat_types::UserId;

/// Token and user used by `--mock` when none are given.
const MOCK_TOKEN: &str = "mock-token";
const MOCK_USER: &str = "me";

/// Everything a command needs to build a controller.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend configuration.
    pub client: ClientConfig,
    /// Signed-in user.
    pub session: Session,
}

impl Settings {
    /// Resolve settings from the config file, overrides and credentials.
    pub fn resolve(
        config_path: Option<&Path>,
        base_url: Option<&str>,
        token: Option<String>,
        user: Option<String>,
        mock: bool,
    ) -> Result<Self> {
        let mut client = match config_path {
            Some(path) => ClientConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(url) = base_url {
            client = client.with_base_url(url);
        }
        client.validate().context("Invalid client configuration")?;

        let (token, user) = if mock {
            (
                token.unwrap_or_else(|| MOCK_TOKEN.to_string()),
                user.unwrap_or_else(|| MOCK_USER.to_string()),
            )
        } else {
            (
                token.context("No token: pass --token or set CHATSYNC_TOKEN")?,
                user.context("No user id: pass --user or set CHATSYNC_USER")?,
            )
        };

        Ok(Self {
            client,
            session: Session::new(UserId::new(user), Credential::new(token)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_config_file() {
        let settings =
            Settings::resolve(None, None, Some("t".into()), Some("u".into()), false).unwrap();

        assert_eq!(settings.client, ClientConfig::default());
        assert_eq!(settings.session.user_id, UserId::new("u"));
        assert_eq!(settings.session.credential.token(), "t");
    }

    #[test]
    fn base_url_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"http://from-file:1\"\npage_size = 7").unwrap();

        let settings = Settings::resolve(
            Some(file.path()),
            Some("https://override.example.com"),
            Some("t".into()),
            Some("u".into()),
            false,
        )
        .unwrap();

        assert_eq!(settings.client.base_url, "https://override.example.com");
        assert_eq!(settings.client.page_size, 7);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = Settings::resolve(None, None, None, Some("u".into()), false).unwrap_err();
        assert!(err.to_string().contains("CHATSYNC_TOKEN"));
    }

    #[test]
    fn missing_user_is_an_error() {
        let err = Settings::resolve(None, None, Some("t".into()), None, false).unwrap_err();
        assert!(err.to_string().contains("CHATSYNC_USER"));
    }

    #[test]
    fn mock_mode_fills_in_credentials() {
        let settings = Settings::resolve(None, None, None, None, true).unwrap();
        assert_eq!(settings.session.user_id, UserId::new(MOCK_USER));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = Settings::resolve(
            None,
            Some("not-a-url"),
            Some("t".into()),
            Some("u".into()),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Settings::resolve(Some(&path), None, Some("t".into()), Some("u".into()), false)
            .unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
