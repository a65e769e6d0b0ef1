// src/text.rs

use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;

/// Decode Census reference-file bytes.
///
/// Lookup, geography and FIPS files are Windows-1252 (Word quotes in titles,
/// Latin-1 place names). Every byte has a mapping, so this never fails.
pub fn decode_cp1252(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}

/// Trim a raw field; blank means absent.
pub fn non_blank(raw: &str) -> Option<&str> {
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Best-effort integer parse of a cell. Missing, blank and non-numeric all
/// yield `None`; ACS suppresses small-sample cells by leaving them blank.
pub fn parse_cell(raw: Option<&str>) -> Option<i64> {
    raw.and_then(non_blank).and_then(|v| v.parse::<i64>().ok())
}

/// Title-case: a cased letter is upper-cased when it starts a run of cased
/// letters and lower-cased otherwise. Digits and punctuation start a new run,
/// so `"1ST"` becomes `"1St"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
        } else {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_absent() {
        assert_eq!(parse_cell(Some(" ")), None);
        assert_eq!(parse_cell(Some("")), None);
        assert_eq!(parse_cell(None), None);
        assert_eq!(parse_cell(Some(".")), None);
        assert_eq!(parse_cell(Some("12.5")), None);
    }

    #[test]
    fn numeric_cells_are_trimmed() {
        assert_eq!(parse_cell(Some(" 42 ")), Some(42));
        assert_eq!(parse_cell(Some("-3")), Some(-3));
        assert_eq!(parse_cell(Some("0")), Some(0));
    }

    #[test]
    fn title_case_matches_census_titles() {
        assert_eq!(title_case("YEAR STRUCTURE BUILT"), "Year Structure Built");
        assert_eq!(title_case("Built 1939 or earlier"), "Built 1939 Or Earlier");
        assert_eq!(title_case("1ST QUARTILE"), "1St Quartile");
        assert_eq!(title_case("owner-occupied"), "Owner-Occupied");
    }

    #[test]
    fn cp1252_decodes_word_quotes() {
        let bytes = b"Householder\x92s \x93Age\x94 Do\xf1a";
        assert_eq!(decode_cp1252(bytes), "Householder\u{2019}s \u{201c}Age\u{201d} Do\u{f1}a");
    }
}
