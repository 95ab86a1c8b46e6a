use regex::Regex;
use std::sync::OnceLock;

/// One or more digits, optionally a decimal point and more digits.
/// No sign, thousands separators, or exponents: anything beyond this shape
/// belongs to the surrounding text, not the token.
fn numeric_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("invalid regex"))
}

/// Scans recognized text left to right and returns every numeric token as a
/// string, in order of first character position. Pure and total: text with
/// no numbers yields an empty vec, never an error. The greedy scan makes
/// overlapping tokens impossible.
pub fn extract_numbers(text: &str) -> Vec<String> {
    numeric_token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(text: &str) -> Vec<String> {
        extract_numbers(text)
    }

    #[test]
    fn decimals_in_order_of_appearance() {
        assert_eq!(extracted("Temp: 36.6 / 101.2F"), ["36.6", "101.2"]);
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(extracted("no numbers here").is_empty());
        assert!(extracted("").is_empty());
    }

    #[test]
    fn integers_and_decimals_mix() {
        assert_eq!(extracted("set 40 to 98.5 over 7 days"), ["40", "98.5", "7"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        assert_eq!(extracted("12 then 12 again"), ["12", "12"]);
    }

    #[test]
    fn trailing_unit_does_not_extend_the_token() {
        assert_eq!(extracted("36.6°C 101.2°C"), ["36.6", "101.2"]);
    }

    #[test]
    fn bare_decimal_point_splits_the_run() {
        // "1.2.3" is a maximal "1.2" followed by "3"; a leading point is
        // never part of a token.
        assert_eq!(extracted("1.2.3"), ["1.2", "3"]);
        assert_eq!(extracted(".5"), ["5"]);
        assert_eq!(extracted("10."), ["10"]);
    }

    #[test]
    fn signs_and_separators_are_not_token_characters() {
        assert_eq!(extracted("-5 +7 1,200"), ["5", "7", "1", "200"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "lo 36.6 hi 101.2";
        assert_eq!(extract_numbers(text), extract_numbers(text));
    }
}
