use chrono::{Local, TimeZone, Utc};

// ============== Timestamp Helpers ==============

/// Current time as unix seconds.
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// `YYYY-MM-DD` in local time, or `-` for an unset/invalid timestamp.
pub fn format_date(ts: i64) -> String {
    if ts <= 0 {
        return "-".to_string();
    }
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

// ============== Text Helpers ==============

/// Keep at most `max_chars` characters. Never splits a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Like `truncate_chars`, but marks the cut with `...`.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    let cut = truncate_chars(s, max_chars);
    if cut.len() == s.len() {
        return cut;
    }
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn truncate_text_adds_ellipsis_only_when_cut() {
        assert_eq!(truncate_text("hello", 5), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
    }

    #[test]
    fn unset_dates_render_as_dash() {
        assert_eq!(format_date(0), "-");
        assert_eq!(format_date(-5), "-");
        assert_eq!(format_date(1_700_000_000).len(), 10);
    }
}
