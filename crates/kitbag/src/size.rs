//! 📏 Byte sizes for humans. Because "1073741824" in a log line is a war crime.

// -- 🪜 each rung is 1024x the one below. yes, KB here means 1024. the pedants can file a ticket.
const SIZE_NAMES: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

// -- 🧮 past ~15 decimals an f64 has nothing left to say, and 10^rounding starts heading for inf
const MAX_ROUNDING: u32 = 15;

/// 📦 Render `size_bytes` in the biggest unit that keeps the value ≥ 1, rounded to
/// `rounding` decimals.
///
/// `0` is `"0B"`. Everything else is `"{value} {unit}"` with at least one decimal:
/// `1024 → "1.0 KB"`, `1_500_000 → "1.43 MB"`.
pub fn convert_size(size_bytes: u64, rounding: u32) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }

    // -- 🔢 integer climb, no logarithms, so exact powers of 1024 land on the right rung
    let mut the_rung = 0usize;
    let mut the_divisor = 1u64;
    while the_rung < SIZE_NAMES.len() - 1 && size_bytes / the_divisor >= 1024 {
        the_divisor *= 1024;
        the_rung += 1;
    }

    let the_value = round_to(size_bytes as f64 / the_divisor as f64, rounding);
    format!("{} {}", format_decimal(the_value), SIZE_NAMES[the_rung])
}

fn round_to(value: f64, rounding: u32) -> f64 {
    if rounding > MAX_ROUNDING {
        return value;
    }
    let the_scale = 10f64.powi(rounding as i32);
    // -- ⚖️ exact ties go to the even neighbour: 1.125 → 1.12, 2.5 → 2, 3.5 → 4
    (value * the_scale).round_ties_even() / the_scale
}

// -- ✏️ shortest float form, but never bare: "1" is written "1.0"
fn format_decimal(value: f64) -> String {
    let the_text = value.to_string();
    if the_text.contains('.') {
        the_text
    } else {
        format!("{}.0", the_text)
    }
}
