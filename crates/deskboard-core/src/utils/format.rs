/// Number of leading characters of a credential kept when logging it
const REDACT_VISIBLE_CHARS: usize = 6;

/// Shorten a credential for logs: keeps a short prefix and the length.
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= REDACT_VISIBLE_CHARS {
        return "***".to_string();
    }
    let prefix: String = secret.chars().take(REDACT_VISIBLE_CHARS).collect();
    format!("{}...({} chars)", prefix, count)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a remaining lifetime in seconds for display, e.g. "14m 05s" or "2h 03m"
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}
