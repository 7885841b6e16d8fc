//! Python identifier rules
//!
//! Schema names are PascalCase (`TaxID`, `ContactInfo`). Generated code needs
//! snake_case attributes and modules, SCREAMING_SNAKE enum members, and must
//! never emit a reserved word as an identifier.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use heck::{ToShoutySnakeCase, ToSnakeCase};
use regex::Regex;

/// Python keywords, plus `BaseModel` members a field must not shadow
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
    // pydantic
    "model_config", "model_fields", "model_computed_fields", "dict", "json",
    "copy", "schema", "construct", "validate",
];

/// Characters that cannot appear in a Python identifier
fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"))
}

pub fn is_reserved(ident: &str) -> bool {
    RESERVED.contains(&ident)
}

/// Module name for a definition (`ContactInfo` -> `contact_info`)
pub fn module_name(definition: &str) -> String {
    definition.to_snake_case()
}

/// Outcome of turning a schema name into a Python identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    /// Set when the name had to be suffixed to avoid a reserved word
    pub reserved: bool,
}

/// snake_case attribute name for a field or relation, escaped if reserved
pub fn field_ident(raw: &str) -> Ident {
    escape(sanitize(&raw.to_snake_case(), "field_"))
}

/// Pluralised attribute name for a many-cardinality relation
pub fn plural_field_ident(raw: &str) -> Ident {
    escape(sanitize(&pluralize(&raw.to_snake_case()), "field_"))
}

/// SCREAMING_SNAKE enum member name
pub fn member_ident(raw: &str) -> Ident {
    escape(sanitize(&raw.to_shouty_snake_case(), "VALUE_"))
}

fn sanitize(name: &str, digit_prefix: &str) -> String {
    let cleaned = invalid_chars().replace_all(name, "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return format!("{}unnamed", digit_prefix);
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{}{}", digit_prefix, cleaned)
    } else {
        cleaned.to_string()
    }
}

fn escape(name: String) -> Ident {
    if is_reserved(&name) {
        Ident {
            name: format!("{}_", name),
            reserved: true,
        }
    } else {
        Ident { name, reserved: false }
    }
}

/// English plural of a snake_case word
///
/// Only the last segment changes. A trailing `s` marks a word as already
/// plural, except for the singular endings `ss`, `us` and `is`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("is") {
        return format!("{}es", stem);
    }
    if word.ends_with("ss") || word.ends_with("us") {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.map_or(false, |c| !"aeiou_".contains(c)) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('x') || word.ends_with('z') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Tracks identifiers already used in one class body
#[derive(Debug, Default)]
pub struct IdentScope {
    used: BTreeSet<String>,
}

impl IdentScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identifier, appending `_` until it is unused.
    ///
    /// Returns the claimed name and whether it had to change.
    pub fn claim(&mut self, ident: &str) -> (String, bool) {
        let mut name = ident.to_string();
        while self.used.contains(&name) {
            name.push('_');
        }
        let changed = name != ident;
        self.used.insert(name.clone());
        (name, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ident_snake_case() {
        assert_eq!(field_ident("TaxID").name, "tax_id");
        assert_eq!(field_ident("ID").name, "id");
        assert_eq!(field_ident("FirstName").name, "first_name");
        assert_eq!(field_ident("Person_id").name, "person_id");
    }

    #[test]
    fn test_reserved_words_get_suffix() {
        let ident = field_ident("Class");
        assert_eq!(ident.name, "class_");
        assert!(ident.reserved);

        let ident = field_ident("From");
        assert_eq!(ident.name, "from_");

        let ident = field_ident("Json");
        assert_eq!(ident.name, "json_");

        assert!(!field_ident("Name").reserved);
    }

    #[test]
    fn test_leading_digit_and_symbols() {
        assert_eq!(field_ident("1stPlace").name, "field_1st_place");
        assert_eq!(field_ident("e-mail").name, "e_mail");
        assert_eq!(member_ident("2xl").name, "VALUE_2XL");
    }

    #[test]
    fn test_member_ident() {
        assert_eq!(member_ident("Active").name, "ACTIVE");
        assert_eq!(member_ident("InProgress").name, "IN_PROGRESS");
        assert_eq!(member_ident("on hold").name, "ON_HOLD");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("person"), "persons");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("comments"), "comments");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("analysis"), "analyses");
        assert_eq!(pluralize("billing_address"), "billing_addresses");
        assert_eq!(plural_field_ident("Status").name, "statuses");
        assert_eq!(plural_field_ident("ContactInfo").name, "contact_infos");
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("ContactInfo"), "contact_info");
        assert_eq!(module_name("Person"), "person");
    }

    #[test]
    fn test_ident_scope_suffixes_collisions() {
        let mut scope = IdentScope::new();
        assert_eq!(scope.claim("person_id"), ("person_id".to_string(), false));
        assert_eq!(scope.claim("person_id"), ("person_id_".to_string(), true));
        assert_eq!(scope.claim("person_id"), ("person_id__".to_string(), true));
    }
}
