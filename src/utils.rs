/// Char-boundary safe prefix, used for log previews of Korean text.
#[inline]
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Round half away from zero to `precision` decimal places.
#[inline]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

pub fn round_all(values: &[f64], precision: u32) -> Vec<f64> {
    values.iter().map(|v| round_to(*v, precision)).collect()
}
