use std::fs;
use std::path::{Path, PathBuf};
use chrono::Local;
use log::info;

use crate::checker::ProfileStatusMap;
use crate::error::Result;

pub const CSV_FILE_NAME: &str = "instagram_profiles.csv";
pub const TEXT_FILE_NAME: &str = "instagram_profiles.txt";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn render_csv(statuses: &ProfileStatusMap, timestamp: &str) -> Result<String> {
    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    csv_writer.write_record(["IG User", "Status", "Timestamp"])?;
    for (username, status) in statuses {
        let status = status.to_string();
        csv_writer.write_record([username.as_str(), status.as_str(), timestamp])?;
    }
    let bytes = csv_writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn render_text(statuses: &ProfileStatusMap, timestamp: &str) -> String {
    statuses
        .iter()
        .map(|(username, status)| format!("{} | {} | {}\n", username, status, timestamp))
        .collect()
}

/// Writes `instagram_profiles.csv` into `dir`, replacing any previous run's file.
pub fn export_csv(statuses: &ProfileStatusMap, dir: &Path) -> Result<PathBuf> {
    let content = render_csv(statuses, &timestamp_now())?;
    write_export(dir, CSV_FILE_NAME, &content)
}

/// Writes `instagram_profiles.txt` into `dir`, replacing any previous run's file.
pub fn export_text(statuses: &ProfileStatusMap, dir: &Path) -> Result<PathBuf> {
    let content = render_text(statuses, &timestamp_now());
    write_export(dir, TEXT_FILE_NAME, &content)
}

fn write_export(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, content)?;
    info!("Exported results to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::ProfileStatus;

    fn sample() -> ProfileStatusMap {
        [("alice", ProfileStatus::Valid), ("bob", ProfileStatus::NotValid)]
            .into_iter()
            .map(|(u, s)| (u.to_string(), s))
            .collect()
    }

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let csv = render_csv(&sample(), "2024-01-02 03:04:05").unwrap();
        assert_eq!(
            csv,
            "IG User,Status,Timestamp\n\
             alice,Valid,2024-01-02 03:04:05\n\
             bob,Not Valid,2024-01-02 03:04:05\n"
        );
    }

    #[test]
    fn text_uses_pipe_separators() {
        let text = render_text(&sample(), "2024-01-02 03:04:05");
        assert_eq!(
            text,
            "alice | Valid | 2024-01-02 03:04:05\nbob | Not Valid | 2024-01-02 03:04:05\n"
        );
    }

    #[test]
    fn exports_overwrite_fixed_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Downloads");

        let first = export_csv(&sample(), &out).unwrap();
        let mut smaller = sample();
        smaller.shift_remove("bob");
        let second = export_csv(&smaller, &out).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.file_name().unwrap(), CSV_FILE_NAME);
        let content = fs::read_to_string(&second).unwrap();
        assert_eq!(content.lines().count(), 2);

        let text_path = export_text(&sample(), &out).unwrap();
        assert_eq!(text_path, out.join(TEXT_FILE_NAME));
        assert_eq!(fs::read_to_string(text_path).unwrap().lines().count(), 2);
    }

    #[test]
    fn repeated_exports_differ_only_in_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let strip = |s: String| -> Vec<String> {
            s.lines().map(|l| l.rsplit_once(" | ").map(|(head, _)| head.to_string()).unwrap_or_default()).collect()
        };
        let a = fs::read_to_string(export_text(&sample(), dir.path()).unwrap()).unwrap();
        let b = fs::read_to_string(export_text(&sample(), dir.path()).unwrap()).unwrap();
        assert_eq!(strip(a), strip(b));
    }
}
