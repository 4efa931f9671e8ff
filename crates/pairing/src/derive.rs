//! Identifier Deriver: proposes an Ayon project name and code from a Kitsu
//! project's name (and optional code).
//!
//! Ayon project names may only contain `[A-Za-z0-9_]`; codes are short
//! lower-case alphanumerics. The derivation is total: every input yields a
//! result, possibly empty. Codes are not padded to the 3 character minimum
//! Ayon documents; an operator may submit a short code and the store decides.
//!
//! The code seed is the Kitsu code when one is present and non-empty,
//! otherwise the raw Kitsu name. Underscores never survive into a code, so
//! seeding from the raw name gives the same code as seeding from the derived
//! name.

use crate::DerivedIdentifier;

/// Maximum number of characters kept in a derived code.
pub const MAX_CODE_LEN: usize = 6;

/// Derives the default Ayon name and code for a Kitsu project.
pub fn derive(foreign_name: &str, foreign_code: Option<&str>) -> DerivedIdentifier {
    let seed = foreign_code
        .filter(|code| !code.is_empty())
        .unwrap_or(foreign_name);

    DerivedIdentifier {
        target_name: derive_target_name(foreign_name),
        target_code: derive_target_code(seed),
    }
}

/// Turns a Kitsu project name into a candidate Ayon project name.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, runs of `_` collapse
/// to one, then a single leading and a single trailing `_` are removed.
pub fn derive_target_name(foreign_name: &str) -> String {
    let mut collapsed = String::with_capacity(foreign_name.len());
    for c in foreign_name.chars() {
        let c = if is_name_char(c) { c } else { '_' };
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    // One strip on each side, not a trim loop.
    let stripped = collapsed.strip_prefix('_').unwrap_or(&collapsed);
    let stripped = stripped.strip_suffix('_').unwrap_or(stripped);
    stripped.to_string()
}

/// Turns a seed string into a candidate Ayon project code.
///
/// Keeps `[A-Za-z0-9]` only, lower-cases, and truncates to
/// [`MAX_CODE_LEN`] characters.
pub fn derive_target_code(seed: &str) -> String {
    let alphanumeric: String = seed.chars().filter(char::is_ascii_alphanumeric).collect();

    // No-op once underscores are gone.
    let stripped = alphanumeric.strip_prefix('_').unwrap_or(&alphanumeric);
    let stripped = stripped.strip_suffix('_').unwrap_or(stripped);

    stripped
        .to_ascii_lowercase()
        .chars()
        .take(MAX_CODE_LEN)
        .collect()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn punctuation_and_spaces_become_single_underscores() {
        let derived = derive("My Project!!", None);
        assert_eq!(derived.target_name, "My_Project");
        assert_eq!(derived.target_code, "myproj");
    }

    #[test]
    fn parenthesised_year_is_folded_into_the_name() {
        let derived = derive("Big Movie (2024)", None);
        assert_eq!(derived.target_name, "Big_Movie_2024");
        assert_eq!(derived.target_code, "bigmov");
    }

    #[test]
    fn boundary_underscores_are_stripped_once() {
        assert_eq!(derive_target_name("___x___"), "x");
        assert_eq!(derive_target_name("_"), "");
        assert_eq!(derive_target_name("__"), "");
        assert_eq!(derive_target_name("!@#"), "");
        assert_eq!(derive_target_name("_a_"), "a");
    }

    #[test]
    fn inner_underscores_are_kept_but_collapsed() {
        assert_eq!(derive_target_name("a__b - c"), "a_b_c");
    }

    #[test]
    fn non_ascii_letters_are_replaced() {
        assert_eq!(derive_target_name("Café Noir"), "Caf_Noir");
        assert_eq!(derive_target_code("Café Noir"), "cafnoi");
    }

    #[test]
    fn foreign_code_seeds_the_code_when_present() {
        let derived = derive("Big Movie", Some("BM_01"));
        assert_eq!(derived.target_name, "Big_Movie");
        assert_eq!(derived.target_code, "bm01");
    }

    #[test]
    fn empty_foreign_code_falls_back_to_the_name() {
        let derived = derive("Big Movie", Some(""));
        assert_eq!(derived.target_code, "bigmov");
    }

    #[test]
    fn short_codes_are_not_padded() {
        assert_eq!(derive("AB", None).target_code, "ab");
        assert_eq!(derive("", None).target_code, "");
        assert_eq!(derive("???", None).target_code, "");
    }

    #[test]
    fn raw_and_normalized_seeds_agree() {
        for name in ["Big Movie (2024)", "__x__", "a-b-c-d-e-f-g", "Ünïcode ✓ 12"] {
            assert_eq!(
                derive_target_code(name),
                derive_target_code(&derive_target_name(name)),
                "seed mismatch for {name:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn derive_is_deterministic(name in ".*", code in proptest::option::of(".*")) {
            let first = derive(&name, code.as_deref());
            let second = derive(&name, code.as_deref());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn derived_names_use_the_name_alphabet(name in ".*") {
            let target = derive_target_name(&name);
            prop_assert!(target.chars().all(is_name_char));
            prop_assert!(!target.contains("__"));
            prop_assert!(!target.starts_with('_'));
            prop_assert!(!target.ends_with('_'));
        }

        #[test]
        fn derived_codes_are_short_lowercase_alphanumerics(name in ".*", code in proptest::option::of(".*")) {
            let target = derive(&name, code.as_deref()).target_code;
            prop_assert!(target.chars().count() <= MAX_CODE_LEN);
            prop_assert!(target.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
