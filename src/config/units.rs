//! Human-readable sizes and durations
//!
//! Sizes: `512`, `512B`, `64K`, `1.5GiB`, `2 TB` (all multiples are binary).
//! Durations: `90`, `30s`, `15m`, `12h`, `14d`, `2w`. A bare number is seconds.
//!
//! Both parsers return signed values so that negative input reaches policy
//! validation and is rejected there with a clear message.

/// Parse a size string into bytes.
pub fn parse_size(s: &str) -> Result<i64, String> {
    let (value, unit) = split_number(s)?;

    let multiplier: f64 = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" | "kib" => 1024.0,
        "m" | "mb" | "mib" => 1024.0 * 1024.0,
        "g" | "gb" | "gib" => 1024.0 * 1024.0 * 1024.0,
        "t" | "tb" | "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return Err(format!("Unknown size unit: {}", unit)),
    };

    to_i64(value * multiplier, s)
}

/// Parse a duration string into whole seconds.
pub fn parse_duration_secs(s: &str) -> Result<i64, String> {
    let (value, unit) = split_number(s)?;

    let multiplier: f64 = match unit.to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => 86400.0,
        "w" | "week" | "weeks" => 7.0 * 86400.0,
        _ => return Err(format!("Unknown duration unit: {}", unit)),
    };

    to_i64(value * multiplier, s)
}

/// Format a byte count for humans, e.g. `1.50 GiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

fn split_number(s: &str) -> Result<(f64, &str), String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty value".to_string());
    }

    // Find where the number ends and the unit begins
    let mut num_end = 0;
    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() || c == '.' || (i == 0 && c == '-') {
            num_end = i + c.len_utf8();
        } else {
            break;
        }
    }

    let num_str = &s[..num_end];
    if num_str.is_empty() || num_str == "-" {
        return Err(format!("No number found in: {}", s));
    }

    let value: f64 = num_str
        .parse()
        .map_err(|e| format!("Failed to parse number '{}': {}", num_str, e))?;

    Ok((value, s[num_end..].trim()))
}

fn to_i64(value: f64, original: &str) -> Result<i64, String> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err(format!("Value out of range: {}", original.trim()));
    }
    // Round away from zero so a non-zero limit never becomes zero and a
    // negative one stays negative.
    let rounded = if value < 0.0 { value.floor() } else { value.ceil() };
    Ok(rounded as i64)
}
