//! Human-readable byte sizes.

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count for display, e.g. `1536` -> `"1.5 KB"`.
///
/// The unit is picked from the decimal magnitude (one step per three digits)
/// while the value is scaled by powers of 1024, so `1000` renders as
/// `"0.98 KB"`. Two decimals at most, trailing zeros stripped.
pub fn to_human_size(bytes: u64) -> String {
    if bytes == 0 {
        return format!("0 {}", SIZE_UNITS[0]);
    }

    let digits = bytes.ilog10() as usize + 1;
    let rank = ((digits - 1) / 3).min(SIZE_UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(rank as i32);

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, SIZE_UNITS[rank])
}
