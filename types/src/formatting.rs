//! Display formatting for character listings and console output.

/// Format a playtime in seconds as `H:MM:SS`.
///
/// # Examples
/// ```
/// use deathwatch_types::formatting::format_playtime;
/// assert_eq!(format_playtime(0), "0:00:00");
/// assert_eq!(format_playtime(3600), "1:00:00");
/// assert_eq!(format_playtime(45_296), "12:34:56");
/// ```
pub fn format_playtime(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format a count with thousands separators (e.g. `1,234`).
pub fn format_thousands(n: u32) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
