//! Free-text search over list keys (sprint numbers, project names)

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_THEN_DIGITS: Regex = Regex::new(r"(?i)[a-z]+\s*(\d+)").unwrap();
    static ref DIGITS_THEN_WORD: Regex = Regex::new(r"(?i)(\d+)\s*[a-z]+").unwrap();
    static ref NON_DIGIT: Regex = Regex::new(r"\D").unwrap();
}

fn digits(text: &str) -> String {
    NON_DIGIT.replace_all(text, "").into_owned()
}

/// Layered match of `query` against one item key.
///
/// Checks run in order: case-insensitive substring, a number written next
/// to a word ("Sprint 12", "12 sprint"), then a digit-subset match when both
/// sides are longer than one character.
pub fn matches_query(key: &str, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return false;
    }

    if key.contains(&query) {
        return true;
    }

    for re in [&*WORD_THEN_DIGITS, &*DIGITS_THEN_WORD] {
        if let Some(number) = re.captures(&query).and_then(|c| c.get(1)) {
            if key.contains(number.as_str()) {
                return true;
            }
        }
    }

    if key.chars().count() > 1 && query.chars().count() > 1 {
        let wanted = digits(&query);
        if !wanted.is_empty() && digits(&key).contains(&wanted) {
            return true;
        }
    }
    false
}
