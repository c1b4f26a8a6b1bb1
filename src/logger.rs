use log::LevelFilter;
use env_logger::{Builder, Target};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};

/// Writes every log line to stderr and to the run's log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

pub fn log_file_name(now: DateTime<Local>) -> String {
    now.format("instagram_check_%Y%m%d_%H%M%S.log").to_string()
}

/// Initializes the process logger once. Returns the log file path, or `None`
/// when only stderr logging could be set up.
pub fn init(dir: &Path) -> Option<PathBuf> {
    let log_path = dir.join(log_file_name(Local::now()));
    let file = fs::create_dir_all(dir).and_then(|_| File::create(&log_path));

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env();

    let (log_path, file_error) = match file {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
            (Some(log_path), None)
        }
        Err(e) => (None, Some(e)),
    };

    if builder.try_init().is_err() {
        return log_path;
    }

    match (&log_path, file_error) {
        (Some(path), _) => log::info!("Logger initialized. Writing to {:?}", path),
        (None, Some(e)) => log::error!("Could not create log file in {:?}: {}", dir, e),
        (None, None) => {}
    }
    log_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_is_timestamped() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(log_file_name(now), "instagram_check_20240309_140507.log");
    }
}
