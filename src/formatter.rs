use serde::Serialize;

use crate::checker::{ProfileStatus, ProfileStatusMap};

/// The four text blocks shown after a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayResults {
    /// Valid usernames followed by the not-valid ones.
    pub all: String,
    pub invalid: String,
    pub valid: String,
    pub summary: String,
}

/// Splits usernames by status, keeping map order inside each side.
pub fn partition(statuses: &ProfileStatusMap) -> (Vec<&str>, Vec<&str>) {
    statuses
        .iter()
        .map(|(username, status)| (username.as_str(), *status))
        .fold((Vec::new(), Vec::new()), |(mut valid, mut invalid), (username, status)| {
            match status {
                ProfileStatus::Valid => valid.push(username),
                ProfileStatus::NotValid => invalid.push(username),
            }
            (valid, invalid)
        })
}

pub fn summary(valid_count: usize, invalid_count: usize) -> String {
    format!(
        "Total Checked: {}\nValid: {}\nNot Valid: {}",
        valid_count + invalid_count,
        valid_count,
        invalid_count
    )
}

pub fn format_results(statuses: &ProfileStatusMap) -> DisplayResults {
    let (valid, invalid) = partition(statuses);
    let all: Vec<&str> = valid.iter().chain(invalid.iter()).copied().collect();

    DisplayResults {
        all: all.join("\n"),
        invalid: invalid.join("\n"),
        valid: valid.join("\n"),
        summary: summary(valid.len(), invalid.len()),
    }
}
