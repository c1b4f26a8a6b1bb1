use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::error::{CheckerError, Result};

pub const BASE_URL: &str = "https://www.instagram.com/";
pub const UNAVAILABLE_MARKER: &str = "Sorry, this page isn't available.";
const DEFAULT_RENDER_DELAY_SECS: u64 = 2;
const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Runtime settings shared by the checker, the exporters and both binaries.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub base_url: String,
    /// Substring whose presence in the rendered markup marks a profile as missing.
    pub unavailable_marker: String,
    /// Fixed wait between navigation and reading the page.
    pub render_delay: Duration,
    /// Upper bound on a single navigation or page read.
    pub navigation_timeout: Duration,
    pub headless: bool,
    /// Where exports and the run log are written.
    pub output_dir: PathBuf,
}

impl CheckerConfig {
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        CheckerConfig {
            base_url: BASE_URL.to_string(),
            unavailable_marker: UNAVAILABLE_MARKER.to_string(),
            render_delay: Duration::from_secs(DEFAULT_RENDER_DELAY_SECS),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            headless: true,
            output_dir,
        }
    }

    /// Default settings writing into the user's downloads directory.
    pub fn from_downloads() -> Result<Self> {
        Ok(Self::with_output_dir(default_output_dir()?))
    }

    /// Appends the username to the base URL as-is, so the host never changes.
    pub fn profile_url(&self, username: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, username))?)
    }
}

/// Platform downloads directory, or `~/Downloads` when the platform has none.
pub fn default_output_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::download_dir() {
        return Ok(dir);
    }
    dirs::home_dir()
        .map(|home| home.join("Downloads"))
        .ok_or(CheckerError::NoOutputDirectory)
}

/// Command-line overrides accepted by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Directory for the exported files and the run log (defaults to Downloads)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Seconds to wait after navigation before reading the page
    #[arg(long)]
    pub delay_secs: Option<u64>,
    /// Seconds before a single navigation is abandoned
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,
}

impl ConfigArgs {
    pub fn into_config(self) -> Result<CheckerConfig> {
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            None => default_output_dir()?,
        };
        let mut config = CheckerConfig::with_output_dir(output_dir);
        if let Some(secs) = self.delay_secs {
            config.render_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout_secs {
            config.navigation_timeout = Duration::from_secs(secs);
        }
        config.headless = !self.headed;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_appends_username() {
        let config = CheckerConfig::with_output_dir(PathBuf::from("."));
        let url = config.profile_url("user_one").unwrap();
        assert_eq!(url.as_str(), "https://www.instagram.com/user_one");
    }

    #[test]
    fn profile_url_keeps_instagram_host() {
        let config = CheckerConfig::with_output_dir(PathBuf::from("."));
        for username in ["//example.com", "https://example.com/alice", "a:b", "../x"] {
            let url = config.profile_url(username).unwrap();
            assert_eq!(url.scheme(), "https", "{username}");
            assert_eq!(url.host_str(), Some("www.instagram.com"), "{username}");
        }
        assert_eq!(
            config.profile_url("a:b").unwrap().as_str(),
            "https://www.instagram.com/a:b"
        );
    }

    #[test]
    fn args_override_defaults() {
        let args = ConfigArgs {
            output_dir: Some(PathBuf::from("/tmp/out")),
            delay_secs: Some(5),
            timeout_secs: None,
            headed: true,
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.render_delay, Duration::from_secs(5));
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert!(!config.headless);
    }
}
