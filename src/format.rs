//! Number formatting for chat messages.

/// Group digits in threes with commas: `1234567` → `1,234,567`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed delta with grouping and an explicit sign: `+1,200`, `-3`, `+0`.
pub fn signed_delta(delta: i64) -> String {
    let sign = if delta < 0 { '-' } else { '+' };
    format!("{}{}", sign, thousands(delta.unsigned_abs()))
}

/// Difference `current - baseline` without overflow surprises.
pub fn delta(current: u64, baseline: u64) -> i64 {
    (i128::from(current) - i128::from(baseline)).clamp(i128::from(i64::MIN), i128::from(i64::MAX))
        as i64
}
