// Progress parsing for the HLS downloader's terminal output
//
// Each line maps to a partial update. Overall progress comes only from the
// `(frag N/M)` marker; the "Downloading: X%" prefix is per-fragment byte
// progress that restarts at 0 for every fragment and is ignored.

use crate::models::{DownloadUpdate, FRAGMENT_MESSAGE_PREFIX};
use regex::Regex;
use std::sync::OnceLock;

/// Percentage reported while the process is still running
const MAX_RUNNING_PERCENT: u8 = 99;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// At least one known pattern matched
    Update(DownloadUpdate),
    /// Nothing matched; the trimmed line may still serve as a status message
    Unrecognized(String),
}

static TOTAL_FRAGMENTS_RE: OnceLock<Regex> = OnceLock::new();
static DESTINATION_RE: OnceLock<Regex> = OnceLock::new();
static MERGING_RE: OnceLock<Regex> = OnceLock::new();
static FRAGMENT_RE: OnceLock<Regex> = OnceLock::new();
static SPEED_RE: OnceLock<Regex> = OnceLock::new();
static SIZE_RE: OnceLock<Regex> = OnceLock::new();

fn total_fragments_re() -> &'static Regex {
    TOTAL_FRAGMENTS_RE.get_or_init(|| Regex::new(r"(?i)\bTotal fragments:\s*(\d+)").unwrap())
}

fn destination_re() -> &'static Regex {
    DESTINATION_RE.get_or_init(|| Regex::new(r"(?i)\bDestination:\s*(.+)$").unwrap())
}

fn merging_re() -> &'static Regex {
    MERGING_RE.get_or_init(|| Regex::new(r"(?i)\bMerging formats into\s+(.+)$").unwrap())
}

fn fragment_re() -> &'static Regex {
    FRAGMENT_RE.get_or_init(|| Regex::new(r"\(frag\s+(\d+)\s*/\s*(\d+)\)").unwrap())
}

fn speed_re() -> &'static Regex {
    SPEED_RE.get_or_init(|| {
        Regex::new(r"(?i)\bat\s+~?\s*(\d+(?:\.\d+)?)\s*(KiB|KB|MiB|MB|GiB|GB|TiB|TB|B)/s").unwrap()
    })
}

fn size_re() -> &'static Regex {
    SIZE_RE.get_or_init(|| {
        Regex::new(r"(?i)\bof\s+~?\s*(\d+(?:\.\d+)?)\s*(KiB|KB|MiB|MB|GiB|GB|TiB|TB|B)\b").unwrap()
    })
}

/// `min(99, round(100 * done / total))`; zero when the total is unknown
pub fn fragment_percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * f64::from(done) / f64::from(total)).round();
    percent.clamp(0.0, f64::from(MAX_RUNNING_PERCENT)) as u8
}

fn unquote(path: &str) -> String {
    path.trim().trim_matches(|c: char| c == '"' || c == '\'').trim().to_string()
}

/// Parse one trimmed output line.
///
/// The total-fragments, destination and merge announcements are structural
/// and returned on their own; fragment, speed and size markers combine.
pub fn parse_line(line: &str) -> ParsedLine {
    if let Some(caps) = total_fragments_re().captures(line) {
        if let Ok(total) = caps[1].parse::<u32>() {
            return ParsedLine::Update(DownloadUpdate {
                total_fragments: Some(total),
                completed_fragments: Some(0),
                last_message: Some(format!("{} fragments", total)),
                ..Default::default()
            });
        }
    }

    if let Some(caps) = merging_re().captures(line) {
        let path = unquote(&caps[1]);
        if !path.is_empty() {
            return ParsedLine::Update(DownloadUpdate {
                file_path: Some(path),
                progress_percent: Some(MAX_RUNNING_PERCENT),
                last_message: Some("Merging…".to_string()),
                ..Default::default()
            });
        }
    }

    if let Some(caps) = destination_re().captures(line) {
        let path = unquote(&caps[1]);
        if !path.is_empty() {
            return ParsedLine::Update(DownloadUpdate {
                file_path: Some(path),
                last_message: Some("Downloading…".to_string()),
                ..Default::default()
            });
        }
    }

    let mut update = DownloadUpdate::default();

    if let Some(caps) = fragment_re().captures(line) {
        if let (Ok(done), Ok(total)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            update.completed_fragments = Some(done);
            update.total_fragments = Some(total);
            update.progress_percent = Some(fragment_percent(done, total));
            update.last_message = Some(format!("{}{} / {}", FRAGMENT_MESSAGE_PREFIX, done, total));
        }
    }

    if let Some(caps) = speed_re().captures(line) {
        update.speed = Some(format!("{}{}/s", &caps[1], &caps[2]));
    }

    if let Some(caps) = size_re().captures(line) {
        update.size_label = Some(format!("{}{}", &caps[1], &caps[2]));
    }

    if update.is_empty() {
        ParsedLine::Unrecognized(line.to_string())
    } else {
        ParsedLine::Update(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(line: &str) -> DownloadUpdate {
        match parse_line(line) {
            ParsedLine::Update(update) => update,
            ParsedLine::Unrecognized(_) => panic!("expected an update for {:?}", line),
        }
    }

    #[test]
    fn test_fragment_marker_drives_progress() {
        let u = update("Downloading: 2.23% (2943016/131755366.4 bytes)/s ETA Unknown (frag 15/672)");
        assert_eq!(u.completed_fragments, Some(15));
        assert_eq!(u.total_fragments, Some(672));
        assert_eq!(u.progress_percent, Some(2));
        assert_eq!(u.last_message.as_deref(), Some("Fragment 15 / 672"));
        assert_eq!(u.speed, None);
    }

    #[test]
    fn test_fragment_speed_and_size_on_one_line() {
        let u = update("[download]   0.8% of ~ 352.64MiB at 3.2MiB/s ETA 01:50 (frag 6/672)");
        assert_eq!(u.completed_fragments, Some(6));
        assert_eq!(u.total_fragments, Some(672));
        assert_eq!(u.progress_percent, Some(1));
        assert_eq!(u.speed.as_deref(), Some("3.2MiB/s"));
        assert_eq!(u.size_label.as_deref(), Some("352.64MiB"));
    }

    #[test]
    fn test_byte_progress_alone_is_unrecognized() {
        assert_eq!(
            parse_line("Downloading: 45.0% (100/200 bytes)/s"),
            ParsedLine::Unrecognized("Downloading: 45.0% (100/200 bytes)/s".to_string())
        );
    }

    #[test]
    fn test_total_fragments_resets_progress() {
        let u = update("[hlsnative] Total fragments: 672");
        assert_eq!(u.total_fragments, Some(672));
        assert_eq!(u.completed_fragments, Some(0));
        assert_eq!(u.last_message.as_deref(), Some("672 fragments"));
        assert_eq!(u.progress_percent, None);
    }

    #[test]
    fn test_merge_announcement() {
        let u = update(r#"[Merger] Merging formats into "/out/Movie (2020).mp4""#);
        assert_eq!(u.file_path.as_deref(), Some("/out/Movie (2020).mp4"));
        assert_eq!(u.progress_percent, Some(99));
        assert_eq!(u.last_message.as_deref(), Some("Merging…"));
    }

    #[test]
    fn test_destination_announcement() {
        let u = update("[download] Destination: /out/Show S01E02.mp4");
        assert_eq!(u.file_path.as_deref(), Some("/out/Show S01E02.mp4"));
        assert_eq!(u.last_message.as_deref(), Some("Downloading…"));
        assert_eq!(u.progress_percent, None);
    }

    #[test]
    fn test_speed_units_case_insensitive() {
        assert_eq!(update("at 512KiB/s").speed.as_deref(), Some("512KiB/s"));
        assert_eq!(update("at 1.5 gb/s").speed.as_deref(), Some("1.5gb/s"));
        assert_eq!(update("100 of 7B at 7B/s").speed.as_deref(), Some("7B/s"));
        assert_eq!(update("of 2.1GiB").size_label.as_deref(), Some("2.1GiB"));
    }

    #[test]
    fn test_housekeeping_line_unrecognized() {
        let line = "[info] Downloading 1 format(s): 1080p";
        assert_eq!(parse_line(line), ParsedLine::Unrecognized(line.to_string()));
    }

    #[test]
    fn test_percent_capped_and_monotonic() {
        let mut last = 0;
        for done in 0..=672 {
            let percent = fragment_percent(done, 672);
            assert!(percent >= last);
            assert!(percent <= 99);
            last = percent;
        }
        assert_eq!(fragment_percent(672, 672), 99);
        assert_eq!(fragment_percent(5, 0), 0);
    }
}
