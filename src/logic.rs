/*
Validation, id and matching rules.
Module was independently written from storage / chat for testing
*/

use crate::error::StoreError;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 200;

// Parse a caller-supplied id.
//
// Surrounding whitespace is ignored; anything else that is not an
// integer is rejected.
pub fn parse_id(raw: &str) -> Result<i64, StoreError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| StoreError::InvalidId(raw.to_string()))
}

// Name rules:
// - not empty / whitespace only
// - at most 50 characters (not bytes)
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(StoreError::name_too_long());
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), StoreError> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(StoreError::description_too_long())
        }
        _ => Ok(()),
    }
}

// max(existing) + 1, or 1 for an empty collection.
// Refused once the largest id is i64::MAX.
pub fn next_id(ids: impl Iterator<Item = i64>) -> Result<i64, StoreError> {
    match ids.max() {
        Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted),
        None => Ok(1),
    }
}

// Description used when the caller gives none (or an empty one):
//     tags present -> "{category} with a, b, c"
//     no tags      -> "{category} {noun}"
pub fn derive_description(category: &str, tags: &[String], noun: &str) -> String {
    if tags.is_empty() {
        format!("{category} {noun}")
    } else {
        format!("{category} with {}", tags.join(", "))
    }
}

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_padded_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
        assert_eq!(parse_id("-3").unwrap(), -3);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("abc"), Err(StoreError::InvalidId(s)) if s == "abc"));
        assert!(parse_id("").is_err());
        assert!(parse_id("1.5").is_err());
    }

    #[test]
    fn name_limits() {
        assert!(matches!(validate_name(""), Err(StoreError::EmptyName)));
        assert!(matches!(validate_name("   "), Err(StoreError::EmptyName)));
        assert!(validate_name(&"a".repeat(50)).is_ok());
        assert!(matches!(
            validate_name(&"a".repeat(51)),
            Err(StoreError::NameTooLong { max: 50 })
        ));
        // 50 multi-byte characters are still 50 characters
        assert!(validate_name(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn description_limits() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some(&"d".repeat(200))).is_ok());
        assert!(matches!(
            validate_description(Some(&"d".repeat(201))),
            Err(StoreError::DescriptionTooLong { max: 200 })
        ));
    }

    #[test]
    fn next_id_is_one_past_max() {
        assert_eq!(next_id([].into_iter()).unwrap(), 1);
        assert_eq!(next_id([3, 1, 2].into_iter()).unwrap(), 4);
        assert_eq!(next_id([10].into_iter()).unwrap(), 11);
    }

    #[test]
    fn next_id_does_not_overflow() {
        assert_eq!(next_id([i64::MAX - 1].into_iter()).unwrap(), i64::MAX);
        assert!(matches!(
            next_id([1, i64::MAX].into_iter()),
            Err(StoreError::IdsExhausted)
        ));
    }

    #[test]
    fn derived_description() {
        assert_eq!(derive_description("breakfast", &[], "meal"), "breakfast meal");
        let tags = vec!["eggs".to_string(), "toast".to_string()];
        assert_eq!(
            derive_description("breakfast", &tags, "meal"),
            "breakfast with eggs, toast"
        );
    }

    #[test]
    fn case_insensitive_matching() {
        assert!(eq_ignore_case("Lunch", "LUNCH"));
        assert!(!eq_ignore_case("lunch", "dinner"));
        assert!(contains_ignore_case("Chicken Salad", "salad"));
        assert!(!contains_ignore_case("Oatmeal", "salad"));
    }
}
