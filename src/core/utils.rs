/// Maximum length (in chars) of a filename stem sent to Telegram
pub const MAX_FILENAME_STEM_CHARS: usize = 120;

/// Escapes characters that are unsafe in file names.
///
/// Replaced characters:
/// - `/` and `\` -> `_` (path separators)
/// - `:` `*` `?` `<` `>` `|` -> `_` (reserved on Windows)
/// - `"` -> `'`
/// - control characters -> `_`
///
/// Leading and trailing whitespace and dots are trimmed. An empty result
/// becomes `"video"`.
///
/// # Example
///
/// ```
/// use reeldrop::core::utils::escape_filename;
///
/// let safe = escape_filename("clip/name*");
/// assert_eq!(safe, "clip_name_");
/// ```
pub fn escape_filename(filename: &str) -> String {
    let mut result = String::with_capacity(filename.len());

    for c in filename.chars() {
        match c {
            '/' | '\\' => result.push('_'),
            ':' | '*' | '?' | '<' | '>' | '|' => result.push('_'),
            '"' => result.push('\''),
            c if c.is_control() => result.push('_'),
            _ => result.push(c),
        }
    }

    let result = result.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if result.is_empty() {
        "video".to_string()
    } else {
        result.to_string()
    }
}

/// Builds the attachment filename from a probed title and an extension.
///
/// # Example
///
/// ```
/// use reeldrop::core::utils::media_filename;
///
/// assert_eq!(media_filename("Dance: part 2", "mp4"), "Dance_ part 2.mp4");
/// ```
pub fn media_filename(title: &str, ext: &str) -> String {
    let stem: String = escape_filename(title).chars().take(MAX_FILENAME_STEM_CHARS).collect();
    // Truncation may leave a trailing space or dot behind
    let stem = stem.trim_end_matches(|c: char| c.is_whitespace() || c == '.');
    let stem = if stem.is_empty() { "video" } else { stem };
    format!("{}.{}", stem, ext)
}

/// Formats a duration in seconds as `m:ss` or `h:mm:ss`.
pub fn format_duration(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
