//! Identifier helpers and the per-run collision counter.
//!
//! Every name the generator emits must be a legal C++ and protobuf identifier
//! and must be unique within one run. This module provides:
//!
//! - [`split_camel_case`] - Word splitting used to derive schema field names
//! - [`to_field_name`] - `bIsDead` -> `b_is_dead`
//! - [`is_compilable_identifier`] - Identifier legality check
//! - [`NameRegistry`] - Collision counter for generated class names
//!
//! ## Collision Suffixes
//!
//! ```
//! use repligen_gen::naming::NameRegistry;
//!
//! let mut names = NameRegistry::default();
//! assert_eq!(names.resolve("Pawn", true), "Pawn");
//! assert_eq!(names.resolve("Pawn", true), "Pawn_2");
//! assert_eq!(names.resolve("Pawn", true), "Pawn_3");
//! ```

use std::collections::{HashMap, HashSet};

/// C++ keywords that can not name a generated class, member or variable.
const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "auto", "bool", "break", "case", "catch", "char", "class", "const",
    "constexpr", "continue", "default", "delete", "do", "double", "else", "enum", "explicit",
    "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "nullptr", "operator", "private", "protected",
    "public", "register", "return", "short", "signed", "sizeof", "static", "struct", "switch",
    "template", "this", "throw", "true", "try", "typedef", "typename", "union", "unsigned",
    "using", "virtual", "void", "volatile", "while",
];

/// Splits a CamelCase string into individual words.
///
/// Handles the naming patterns found in reflected classes and properties:
/// - "bIsDead" -> ["b", "Is", "Dead"]
/// - "MaxHP" -> ["Max", "HP"]
/// - "HTTPClient" -> ["HTTP", "Client"]
/// - "health" -> ["health"]
pub fn split_camel_case(s: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut word_start = 0;
    let chars: Vec<(usize, char)> = s.char_indices().collect();

    for i in 1..chars.len() {
        let (offset, current) = chars[i];
        let prev = chars[i - 1].1;

        // Split before uppercase that follows lowercase, or before the last
        // capital of an acronym that starts a new word.
        let is_new_word = current.is_uppercase()
            && (prev.is_lowercase()
                || (i + 1 < chars.len() && chars[i + 1].1.is_lowercase() && prev.is_uppercase()));

        if is_new_word {
            if offset > word_start {
                words.push(&s[word_start..offset]);
            }
            word_start = offset;
        }
    }

    if word_start < s.len() {
        words.push(&s[word_start..]);
    }

    words
}

/// Converts a property name into a lowercase schema field name.
///
/// ```
/// use repligen_gen::naming::to_field_name;
///
/// assert_eq!(to_field_name("bIsDead"), "b_is_dead");
/// assert_eq!(to_field_name("MaxHP"), "max_hp");
/// assert_eq!(to_field_name("Max_HP"), "max_hp");
/// ```
pub fn to_field_name(name: &str) -> String {
    split_camel_case(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Returns true when `name` is usable as a C++ identifier.
///
/// ```
/// use repligen_gen::naming::is_compilable_identifier;
///
/// assert!(is_compilable_identifier("BP_Ghost_C"));
/// assert!(!is_compilable_identifier("My Ghost"));
/// assert!(!is_compilable_identifier("3DWidget"));
/// assert!(!is_compilable_identifier("class"));
/// ```
pub fn is_compilable_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !CPP_KEYWORDS.contains(&name)
}

/// Per-run registry of generated class names.
///
/// Names are handed out in call order. The first class with a given base
/// name keeps it; later ones get `_2`, `_3`, ... A suffixed candidate that is
/// already taken by another class is skipped, so every issued name is unique.
/// The registry is reset at the start of every run, which makes identical
/// input order produce identical names.
#[derive(Debug, Default)]
pub struct NameRegistry {
    same_name_counter: HashMap<String, u32>,
    issued: HashSet<String>,
    illegal_class_index: u32,
}

impl NameRegistry {
    /// Returns `name` if it is compilable, otherwise the next
    /// `_IllegalClassName_<n>_` placeholder.
    pub fn compilable_class_name(&mut self, name: &str) -> String {
        if is_compilable_identifier(name) {
            name.to_string()
        } else {
            self.illegal_class_index += 1;
            format!("_IllegalClassName_{}_", self.illegal_class_index)
        }
    }

    /// Resolves the generated name for a class whose compilable name is `base`.
    ///
    /// Without `increment_if_same_name` the base is returned untouched and
    /// nothing is recorded, which lets callers re-derive names for lookups.
    pub fn resolve(&mut self, base: &str, increment_if_same_name: bool) -> String {
        if !increment_if_same_name {
            return base.to_string();
        }

        let count = self.same_name_counter.entry(base.to_string()).or_insert(0);
        *count += 1;
        let mut candidate = if *count == 1 {
            base.to_string()
        } else {
            format!("{base}_{count}")
        };
        while self.issued.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}_{count}");
        }

        self.issued.insert(candidate.clone());
        candidate
    }

    /// Forgets every name issued so far.
    pub fn reset(&mut self) {
        self.same_name_counter.clear();
        self.issued.clear();
        self.illegal_class_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === split_camel_case tests ===

    #[test]
    fn split_camel_case_bool_prefix() {
        assert_eq!(split_camel_case("bIsDead"), vec!["b", "Is", "Dead"]);
    }

    #[test]
    fn split_camel_case_with_acronym() {
        assert_eq!(split_camel_case("MaxHP"), vec!["Max", "HP"]);
        assert_eq!(split_camel_case("HTTPClient"), vec!["HTTP", "Client"]);
    }

    #[test]
    fn split_camel_case_single_word() {
        assert_eq!(split_camel_case("health"), vec!["health"]);
    }

    #[test]
    fn split_camel_case_empty() {
        assert_eq!(split_camel_case(""), Vec::<&str>::new());
    }

    #[test]
    fn split_camel_case_non_ascii_does_not_panic() {
        assert_eq!(split_camel_case("ÉtatFinal"), vec!["État", "Final"]);
    }

    // === is_compilable_identifier tests ===

    #[test]
    fn rejects_empty_and_symbols() {
        assert!(!is_compilable_identifier(""));
        assert!(!is_compilable_identifier("Ghost-2"));
        assert!(!is_compilable_identifier("Gh ost"));
    }

    #[test]
    fn accepts_leading_underscore() {
        assert!(is_compilable_identifier("_Hidden"));
    }

    // === NameRegistry tests ===

    #[test]
    fn second_and_later_occurrences_get_suffixes() {
        let mut names = NameRegistry::default();
        let issued: Vec<_> = ["Pawn", "Door", "Pawn", "Pawn", "Door"]
            .iter()
            .map(|n| names.resolve(n, true))
            .collect();

        assert_eq!(issued, ["Pawn", "Door", "Pawn_2", "Pawn_3", "Door_2"]);
    }

    #[test]
    fn suffix_skips_names_taken_by_other_classes() {
        let mut names = NameRegistry::default();
        assert_eq!(names.resolve("Pawn_2", true), "Pawn_2");
        assert_eq!(names.resolve("Pawn", true), "Pawn");
        assert_eq!(names.resolve("Pawn", true), "Pawn_3");
    }

    #[test]
    fn without_increment_nothing_is_recorded() {
        let mut names = NameRegistry::default();
        assert_eq!(names.resolve("Pawn", false), "Pawn");
        assert_eq!(names.resolve("Pawn", false), "Pawn");
        assert_eq!(names.resolve("Pawn", true), "Pawn");
    }

    #[test]
    fn reset_makes_runs_repeatable() {
        let mut names = NameRegistry::default();
        let first: Vec<_> = ["A", "A"].iter().map(|n| names.resolve(n, true)).collect();
        names.reset();
        let second: Vec<_> = ["A", "A"].iter().map(|n| names.resolve(n, true)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn illegal_class_names_get_numbered_placeholders() {
        let mut names = NameRegistry::default();
        assert_eq!(names.compilable_class_name("Ghost"), "Ghost");
        assert_eq!(names.compilable_class_name("My Ghost"), "_IllegalClassName_1_");
        assert_eq!(names.compilable_class_name("1Up"), "_IllegalClassName_2_");
    }
}
