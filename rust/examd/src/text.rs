/// Replace Arabic-Indic (U+0660..U+0669) and Eastern Arabic-Indic
/// (U+06F0..U+06F9) digits with ASCII digits.
pub fn fold_arabic_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{066B}' => '.',
            _ => c,
        })
        .collect()
}

/// Keep only the digits of a typed subscription number.
pub fn sanitize_subscription_number(s: &str) -> String {
    fold_arabic_digits(s)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}

pub fn is_valid_subscription_number(s: &str) -> bool {
    (4..=20).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_both_arabic_digit_blocks() {
        assert_eq!(fold_arabic_digits("١٢٣"), "123");
        assert_eq!(fold_arabic_digits("۴۵"), "45");
        assert_eq!(fold_arabic_digits("٩٠٫٥"), "90.5");
    }

    #[test]
    fn sanitize_then_validate() {
        assert_eq!(sanitize_subscription_number(" 12-34 56 "), "123456");
        assert_eq!(sanitize_subscription_number("١٢٣٤٥"), "12345");
        assert!(is_valid_subscription_number("1234"));
        assert!(!is_valid_subscription_number("123"));
        assert!(!is_valid_subscription_number(&"9".repeat(21)));
        assert!(!is_valid_subscription_number(""));
    }
}
