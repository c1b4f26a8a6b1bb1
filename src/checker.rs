use std::fmt;
use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use tokio::time::timeout;

use crate::browser::{ChromeSession, PageSource};
use crate::config::CheckerConfig;
use crate::delay_manager;
use crate::error::{CheckerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileStatus {
    Valid,
    NotValid,
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileStatus::Valid => f.write_str("Valid"),
            ProfileStatus::NotValid => f.write_str("Not Valid"),
        }
    }
}

/// Username to status, in the order usernames were first checked. A repeated
/// username keeps its first position and takes the latest status.
pub type ProfileStatusMap = IndexMap<String, ProfileStatus>;

/// Snapshot handed to the progress callback after each username.
#[derive(Debug, Clone)]
pub struct ProgressUpdate<'a> {
    pub processed: usize,
    pub total: usize,
    pub username: &'a str,
    pub status: ProfileStatus,
    /// Every result line so far, `"<username:30> | <status>"`.
    pub running_text: &'a str,
}

impl ProgressUpdate<'_> {
    pub fn message(&self) -> String {
        format!("Processing {}/{} users... Checking: {}", self.processed, self.total, self.username)
    }
}

pub fn classify(markup: &str, marker: &str) -> ProfileStatus {
    if markup.contains(marker) {
        ProfileStatus::NotValid
    } else {
        ProfileStatus::Valid
    }
}

pub fn result_line(username: &str, status: ProfileStatus) -> String {
    format!("{:<30} | {}\n", username, status)
}

/// Launches a browser for the batch and checks every username with it.
pub async fn with_session<F>(
    config: &CheckerConfig,
    usernames: &[String],
    on_progress: F,
) -> Result<ProfileStatusMap>
where
    F: FnMut(&ProgressUpdate<'_>),
{
    let session = ChromeSession::launch(config.headless).await?;
    Ok(check_profiles(session, usernames, config, on_progress).await)
}

/// Checks usernames one at a time. Per-username failures become `NotValid`;
/// the source is closed once the loop is done.
pub async fn check_profiles<S, F>(
    mut source: S,
    usernames: &[String],
    config: &CheckerConfig,
    mut on_progress: F,
) -> ProfileStatusMap
where
    S: PageSource,
    F: FnMut(&ProgressUpdate<'_>),
{
    let mut statuses = ProfileStatusMap::new();
    let mut running_text = String::new();
    let total = usernames.len();

    for (i, username) in usernames.iter().enumerate() {
        info!("Processing {}/{} users... Checking: {}", i + 1, total, username);

        let status = match check_one(&mut source, username, config).await {
            Ok(status) => status,
            Err(e) => {
                warn!("{}", e);
                ProfileStatus::NotValid
            }
        };
        statuses.insert(username.clone(), status);
        running_text.push_str(&result_line(username, status));

        on_progress(&ProgressUpdate {
            processed: i + 1,
            total,
            username,
            status,
            running_text: &running_text,
        });
    }

    if let Err(e) = source.close().await {
        warn!("{}", e);
    }
    info!("Checked {} usernames ({} distinct)", total, statuses.len());
    statuses
}

async fn check_one<S: PageSource>(
    source: &mut S,
    username: &str,
    config: &CheckerConfig,
) -> Result<ProfileStatus> {
    let failure = |reason: String| CheckerError::ProfileCheck {
        username: username.to_string(),
        reason,
    };

    let url = config.profile_url(username).map_err(|e| failure(e.to_string()))?;

    timeout(config.navigation_timeout, source.navigate(&url))
        .await
        .map_err(|_| failure(format!("navigation timed out after {:?}", config.navigation_timeout)))?
        .map_err(|e| failure(e.to_string()))?;

    delay_manager::render_wait(config.render_delay).await;

    let markup = timeout(config.navigation_timeout, source.content())
        .await
        .map_err(|_| failure("page read timed out".to_string()))?
        .map_err(|e| failure(e.to_string()))?;

    Ok(classify(&markup, &config.unavailable_marker))
}
