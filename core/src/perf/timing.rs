use once_cell::sync::Lazy;
use regex::Regex;

static TIME_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"TIME: ([0-9.]+)").ok());

/// Pull the seconds value out of the first `TIME: <n>` token in `output`.
///
/// The captured run of digits and dots is read leniently: the longest
/// leading decimal is used, so `1.2.3` reads as `1.2` and a bare `.` as `0.0`.
pub fn extract_time(output: &str) -> Option<f64> {
    let pattern = TIME_PATTERN.as_ref()?;
    let captures = pattern.captures(output)?;
    let token = captures.get(1)?.as_str();
    Some(lenient_decimal(token))
}

fn lenient_decimal(token: &str) -> f64 {
    let bytes = token.as_bytes();
    let mut end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction = bytes[end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if fraction > 0 {
            end += 1 + fraction;
        }
    }
    let prefix = &token[..end];
    if prefix.is_empty() {
        return 0.0;
    }
    prefix.parse().unwrap_or(0.0)
}

/// Render an average the way the result columns have always been written:
/// shortest round-trip digits, always with a fractional part in fixed
/// notation, and `d.ddde±XX` outside of `1e-4 <= |v| < 1e16`.
pub fn format_average(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value == 0.0 {
        return format!("{}0.0", sign);
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. `3.75e-1`.
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return format!("{}{}", sign, sci),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = match exponent.parse() {
        Ok(exp) => exp,
        Err(_) => return format!("{}{}", sign, sci),
    };
    // Position of the decimal point relative to the first digit.
    let decpt = exponent + 1;

    let body = if decpt > 0 && decpt <= 16 {
        let point = decpt as usize;
        if point >= digits.len() {
            format!("{}{}.0", digits, "0".repeat(point - digits.len()))
        } else {
            format!("{}.{}", &digits[..point], &digits[point..])
        }
    } else if decpt <= 0 && decpt > -4 {
        format!("0.{}{}", "0".repeat((-decpt) as usize), digits)
    } else {
        let (lead, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        format!("{}.{}e{:+03}", lead, rest, decpt - 1)
    };
    format!("{}{}", sign, body)
}
