//! Diagnostics
//!
//! Collects soft degradations during compilation. None of these abort a
//! batch: each one records a fallback the compiler already applied.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Stable code per kind of fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Polymorphic `through` matched no polymorphic relation; fell back to Any
    UnresolvedThrough,
    /// Scalar type name not recognised; fell back to Any
    UnknownType,
    /// Referenced definition is not in the registry; emitted without import
    UnresolvedReference,
    /// Identifier collided with a reserved word and was suffixed
    ReservedIdentifier,
    /// Two fields mapped to the same identifier; the later one was suffixed
    IdentifierCollision,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedThrough => "W001",
            Self::UnknownType => "W002",
            Self::UnresolvedReference => "W003",
            Self::ReservedIdentifier => "W004",
            Self::IdentifierCollision => "W005",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnresolvedThrough | Self::UnknownType | Self::UnresolvedReference => {
                Severity::Warning
            }
            Self::ReservedIdentifier | Self::IdentifierCollision => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Warnings change the emitted types; notes only rename identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// One fallback applied to one definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Definition that caused this diagnostic
    pub definition: String,
    pub code: DiagnosticCode,
    /// What happened, naming the field or relation
    pub message: String,
    /// Additional context (field or relation names, fallbacks)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(definition: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.definition
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from one or more definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn unresolved_through(&mut self, definition: &str, relation: &str, through: &str) {
        self.push(
            DiagnosticItem::new(
                definition,
                DiagnosticCode::UnresolvedThrough,
                format!(
                    "relation '{}' goes through '{}', which is not a polymorphic relation of any definition",
                    relation, through
                ),
            )
            .with_context("navigation type falls back to Any"),
        );
    }

    pub fn unknown_type(&mut self, definition: &str, field: &str, type_name: &str) {
        self.push(
            DiagnosticItem::new(
                definition,
                DiagnosticCode::UnknownType,
                format!("field '{}' has unknown type '{}'", field, type_name),
            )
            .with_context("mapped to Any"),
        );
    }

    pub fn unresolved_reference(&mut self, definition: &str, member: &str, target: &str) {
        self.push(DiagnosticItem::new(
            definition,
            DiagnosticCode::UnresolvedReference,
            format!("'{}' references '{}', which is not in the registry", member, target),
        ));
    }

    pub fn reserved_identifier(&mut self, definition: &str, original: &str, renamed: &str) {
        self.push(DiagnosticItem::new(
            definition,
            DiagnosticCode::ReservedIdentifier,
            format!("'{}' is reserved, emitted as '{}'", original, renamed),
        ));
    }

    pub fn identifier_collision(&mut self, definition: &str, original: &str, renamed: &str) {
        self.push(DiagnosticItem::new(
            definition,
            DiagnosticCode::IdentifierCollision,
            format!("'{}' collides with an earlier field, emitted as '{}'", original, renamed),
        ));
    }

    /// Items that changed an emitted type
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items carrying a specific code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Append the items of another collection
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// One item per line, then a summary count
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} warning(s), {} note(s)\n",
                self.warning_count(),
                self.len() - self.warning_count()
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::UnresolvedThrough.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::ReservedIdentifier.severity(), Severity::Info);
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.unresolved_through("Post", "Comments", "Commentable");
        diags.reserved_identifier("Post", "class", "class_");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.with_code(DiagnosticCode::ReservedIdentifier).count(), 1);
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let mut diags = Diagnostics::new();
        diags.unknown_type("Person", "Nickname", "Moniker");
        let text = diags.to_string();
        assert!(text.contains("[W002] warning"));
        assert!(text.contains("mapped to Any"));
        assert!(text.contains("1 warning(s), 0 note(s)"));
    }
}
