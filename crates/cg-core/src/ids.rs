//! Entity IDs are decimal integers rendered as strings. Only the exact
//! rendering an engine hands out resolves; `"01"`, `"+1"` or `" 1"` do not.

use std::fmt::Display;
use std::str::FromStr;

/// Parses `id` as a key, rejecting any spelling other than the canonical one.
pub fn parse_canonical<T>(id: &str) -> Option<T>
where
    T: FromStr + Display,
{
    let key = id.parse::<T>().ok()?;
    (key.to_string() == id).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_integers() {
        assert_eq!(parse_canonical::<u64>("1"), Some(1));
        assert_eq!(parse_canonical::<i64>("42"), Some(42));
        assert_eq!(parse_canonical::<i64>("0"), Some(0));
    }

    #[test]
    fn rejects_other_spellings() {
        for id in ["01", "+1", "+01", " 1", "1 ", "", "abc", "1e3"] {
            assert_eq!(parse_canonical::<i64>(id), None, "{id:?}");
            assert_eq!(parse_canonical::<u64>(id), None, "{id:?}");
        }
    }
}
