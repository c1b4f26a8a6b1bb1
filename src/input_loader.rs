use std::borrow::Cow;
use std::fs;
use std::path::Path;
use log::{info, warn};
use calamine::{open_workbook_auto, Reader};
use chardetng::EncodingDetector;
use csv::StringRecord;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{CheckerError, Result};

/// Header that holds the usernames in uploaded tables, matched case-insensitively.
pub const USER_COLUMN: &str = "ig user";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// An artist line followed by its `@username` line in pasted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistUser {
    pub artist: String,
    pub username: String,
}

/// Usernames read from a table, with per-row outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedUsers {
    pub usernames: Vec<String>,
    pub valid_count: usize,
    pub empty_count: usize,
    pub error_count: usize,
}

impl LoadedUsers {
    pub fn total_rows(&self) -> usize {
        self.valid_count + self.empty_count + self.error_count
    }

    fn push_cell(&mut self, value: Option<&str>) {
        match value.map(str::trim) {
            Some(user) if !user.is_empty() => {
                self.usernames.push(user.to_string());
                self.valid_count += 1;
            }
            _ => self.empty_count += 1,
        }
    }
}

/// Pairs every `@`-prefixed line with the line right above it. Lines that
/// hold nothing but `@` are skipped.
pub fn extract_pairs(text: &str) -> Vec<ArtistUser> {
    let lines: Vec<&str> = text.split('\n').collect();
    lines
        .windows(2)
        .filter(|pair| pair[1].starts_with('@'))
        .filter_map(|pair| {
            let username = pair[1].trim().trim_start_matches('@').trim();
            if username.is_empty() {
                return None;
            }
            Some(ArtistUser {
                artist: pair[0].trim().to_string(),
                username: username.to_string(),
            })
        })
        .collect()
}

pub fn usernames(pairs: &[ArtistUser]) -> Vec<String> {
    pairs.iter().map(|p| p.username.clone()).collect()
}

/// Loads the `ig user` column from a CSV-like file or a spreadsheet.
pub fn load_from_table<P: AsRef<Path>>(path: P) -> Result<LoadedUsers> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckerError::UnsupportedFile(format!("{:?} does not exist", path)));
    }

    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "xlsx" | "xls" | "xlsm" | "ods"))
        .unwrap_or(false);

    let loaded = if is_spreadsheet {
        load_spreadsheet(path)?
    } else {
        let bytes = fs::read(path)?;
        load_csv_bytes(&bytes)?
    };

    info!(
        "Loaded {} usernames from {:?} ({} valid, {} empty, {} errors)",
        loaded.usernames.len(), path, loaded.valid_count, loaded.empty_count, loaded.error_count
    );
    Ok(loaded)
}

/// Encoding named by a BOM if present, otherwise a content-based guess.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        }
    }
}

pub fn decode_text(bytes: &[u8]) -> String {
    let (text, used, had_errors) = detect_encoding(bytes).decode(bytes);
    if had_errors {
        warn!("Input decoded as {} with replacement characters", used.name());
        if used != UTF_8 {
            return String::from_utf8_lossy(bytes).into_owned();
        }
    }
    text.into_owned()
}

/// Reads the `ig user` column from delimited text. Input marked as UTF-8 by
/// its BOM is read row by row, and rows that are not valid UTF-8 count as
/// errors. Anything else is decoded as a whole first.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<LoadedUsers> {
    let data: Cow<'_, [u8]> = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => Cow::Borrowed(rest),
        None => Cow::Owned(decode_text(bytes).into_bytes()),
    };
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data.as_ref());

    let header = StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());
    let column = find_user_column(header.iter())?;

    let mut loaded = LoadedUsers::default();
    for (row, result) in rdr.byte_records().enumerate() {
        let record = result
            .map_err(|e| e.to_string())
            .and_then(|raw| StringRecord::from_byte_record(raw).map_err(|e| e.to_string()));
        match record {
            Ok(record) => loaded.push_cell(record.get(column)),
            Err(reason) => {
                let err = CheckerError::RowRead { row: row + 1, reason };
                warn!("{}", err);
                loaded.error_count += 1;
            }
        }
    }
    Ok(loaded)
}

fn load_spreadsheet(path: &Path) -> Result<LoadedUsers> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(CheckerError::MissingColumn(USER_COLUMN.to_string())),
    };

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|cell| cell.to_string()).collect(),
        None => return Err(CheckerError::MissingColumn(USER_COLUMN.to_string())),
    };
    let column = find_user_column(header.iter().map(String::as_str))?;

    let mut loaded = LoadedUsers::default();
    for row in rows {
        let value = row.get(column).map(|cell| cell.to_string());
        loaded.push_cell(value.as_deref());
    }
    Ok(loaded)
}

fn find_user_column<'a, I>(headers: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .position(|h| h.trim().to_lowercase() == USER_COLUMN)
        .ok_or_else(|| CheckerError::MissingColumn(USER_COLUMN.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pairs_follow_artist_lines() {
        let pairs = extract_pairs("Artist One\n@user_one\nArtist Two\n@user_two");
        assert_eq!(
            pairs,
            vec![
                ArtistUser { artist: "Artist One".into(), username: "user_one".into() },
                ArtistUser { artist: "Artist Two".into(), username: "user_two".into() },
            ]
        );
        assert_eq!(usernames(&pairs), vec!["user_one", "user_two"]);
    }

    #[test]
    fn first_line_and_unpaired_lines_are_ignored() {
        let pairs = extract_pairs("@orphan\nNo handle here\nStill nothing\nArtist\n@found  \r");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].artist, "Artist");
        assert_eq!(pairs[0].username, "found");
    }

    #[test]
    fn consecutive_handles_use_previous_line_as_artist() {
        let pairs = extract_pairs("Band\n@first\n@second");
        assert_eq!(pairs[1].artist, "@first");
        assert_eq!(pairs[1].username, "second");
    }

    #[test]
    fn bare_at_lines_are_skipped() {
        let pairs = extract_pairs("Artist\n@\nOther\n@@  \nLast\n@ kept");
        assert_eq!(pairs, vec![ArtistUser { artist: "Last".into(), username: "kept".into() }]);
    }

    #[test]
    fn header_match_ignores_case() {
        let loaded = load_csv_bytes(b"Name,IG User\nA,alice\nB,\nC,  carol \n").unwrap();
        assert_eq!(loaded.usernames, vec!["alice", "carol"]);
        assert_eq!(loaded.valid_count, 2);
        assert_eq!(loaded.empty_count, 1);
        assert_eq!(loaded.error_count, 0);
        assert_eq!(loaded.total_rows(), 3);
    }

    #[test]
    fn missing_column_is_an_error() {
        for csv in ["name,instagram\nA,alice\n", "IG_USER\nalice\n", ""] {
            let err = load_csv_bytes(csv.as_bytes()).unwrap_err();
            assert!(matches!(err, CheckerError::MissingColumn(_)), "{csv:?}");
        }
    }

    #[test]
    fn short_rows_count_as_empty() {
        let loaded = load_csv_bytes(b"artist,ig user\nA\nB,bob\n").unwrap();
        assert_eq!(loaded.usernames, vec!["bob"]);
        assert_eq!(loaded.empty_count, 1);
    }

    #[test]
    fn latin1_content_is_decoded() {
        let bytes = b"Artist,IG User\nBj\xf6rk,bjork\nCaf\xe9 Tacvba,cafetacvba\n";
        let loaded = load_csv_bytes(bytes).unwrap();
        assert_eq!(loaded.usernames, vec!["bjork", "cafetacvba"]);
    }

    #[test]
    fn utf8_bom_is_stripped_from_header() {
        let loaded = load_csv_bytes("\u{feff}ig user\nalice\n".as_bytes()).unwrap();
        assert_eq!(loaded.usernames, vec!["alice"]);
    }

    #[test]
    fn undecodable_rows_are_counted_as_errors() {
        let bytes = b"\xEF\xBB\xBFartist,IG User\nA,alice\nB,b\xFF\xFEb\nC,\nD,dave\n";
        let loaded = load_csv_bytes(bytes).unwrap();
        assert_eq!(loaded.usernames, vec!["alice", "dave"]);
        assert_eq!(loaded.valid_count, 2);
        assert_eq!(loaded.empty_count, 1);
        assert_eq!(loaded.error_count, 1);
        assert_eq!(loaded.total_rows(), 4);
    }

    #[test]
    fn utf16_input_is_decoded_before_parsing() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "IG User\nalice\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let loaded = load_csv_bytes(&bytes).unwrap();
        assert_eq!(loaded.usernames, vec!["alice"]);
    }

    #[test]
    fn load_from_table_reads_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "IG USER,Artist").unwrap();
        writeln!(file, "alice,A").unwrap();
        writeln!(file, ",B").unwrap();
        drop(file);

        let loaded = load_from_table(&path).unwrap();
        assert_eq!(loaded.usernames, vec!["alice"]);
        assert_eq!(loaded.empty_count, 1);
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("src/fixtures").join(name)
    }

    #[test]
    fn spreadsheet_column_is_read_with_blank_cells_as_empty() {
        let loaded = load_from_table(fixture("users.xlsx")).unwrap();
        assert_eq!(loaded.usernames, vec!["alice", "carol"]);
        assert_eq!(loaded.valid_count, 2);
        assert_eq!(loaded.empty_count, 2);
        assert_eq!(loaded.error_count, 0);
    }

    #[test]
    fn spreadsheet_without_user_column_is_an_error() {
        for name in ["no_column.xlsx", "empty.xlsx"] {
            let err = load_from_table(fixture(name)).unwrap_err();
            assert!(matches!(err, CheckerError::MissingColumn(_)), "{name}");
        }
    }

    #[test]
    fn load_from_table_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_table(dir.path().join("nope.csv")).is_err());
    }
}
