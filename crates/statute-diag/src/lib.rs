//! Diagnostics for the statute middle-end.
//!
//! The type checker and the translator report through the [`Diagnostic`]
//! builder below. Diagnostics never mention inference variables: every type
//! shown to the user has been resolved first, with unconstrained parts
//! printed as `any`.

use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
}

/// Broad category for diagnostics. Each one has a stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Two types that must be equal are not.
    TypeMismatch,
    /// Variable, field, constructor, struct, enum or scope not in scope.
    UndefinedName,
    /// Wrong number of arguments or tuple components.
    ArityMismatch,
    /// Operator with no instance at the requested operand kind.
    UnsupportedOperator,
    /// A construct reached a pass that cannot handle it. Always a bug in an
    /// earlier pass, never a user error.
    Internal,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::TypeMismatch,
        Category::UndefinedName,
        Category::ArityMismatch,
        Category::UnsupportedOperator,
        Category::Internal,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeMismatch => "type_mismatch",
            Category::UndefinedName => "undefined_name",
            Category::ArityMismatch => "arity_mismatch",
            Category::UnsupportedOperator => "unsupported_operator",
            Category::Internal => "internal",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::TypeMismatch => "E0001",
            Category::UndefinedName => "E0002",
            Category::ArityMismatch => "E0003",
            Category::UnsupportedOperator => "E0004",
            Category::Internal => "E0900",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::TypeMismatch => "Expression type does not match the expected type.",
            Category::UndefinedName => "A referenced name is not declared.",
            Category::ArityMismatch => {
                "A function or tuple was used with the wrong number of components."
            }
            Category::UnsupportedOperator => {
                "The operator has no instance for the given operand kind."
            }
            Category::Internal => "An earlier compiler pass produced an unexpected construct.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::TypeMismatch => "Convert one side explicitly, e.g. with integer_to_decimal.",
            Category::UndefinedName => "Declare the missing name or fix the spelling.",
            Category::ArityMismatch => "Pass exactly the declared number of arguments.",
            Category::UnsupportedOperator => {
                "Use a supported operand kind, e.g. subtract two dates to get a duration."
            }
            Category::Internal => "Report the program that triggered this error.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations
// ---------------------------------------------------------------------------

/// A byte range in a source file. Callers convert AST spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0001).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Secondary spans, e.g. where the expected type came from.
    pub labels: Vec<DiagLabel>,
    pub help: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity,
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
        };
        match &self.code {
            Some(code) => write!(f, "{prefix}[{code}]: {}", self.message)?,
            None => write!(f, "{prefix}: {}", self.message)?,
        }
        for label in &self.labels {
            write!(
                f,
                "\n  --> {}:{}..{}: {}",
                label.location.file_id, label.location.start, label.location.end, label.message
            )?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// One or more diagnostics, as returned by the passes.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn first_category(&self) -> Option<Category> {
        self.0.first().map(|d| d.category)
    }
}

impl From<Diagnostic> for DiagnosticError {
    fn from(diag: Diagnostic) -> Self {
        Self::single(diag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn loc(start: u32, end: u32) -> SourceLocation {
        SourceLocation {
            file_id: 0,
            start,
            end,
        }
    }

    #[test]
    fn diagnostic_builder() {
        let diag = Diagnostic::error(Category::TypeMismatch, "expected money, found integer")
            .at(loc(10, 20))
            .with_help("Multiply by a money amount instead");

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.as_deref(), Some("E0001"));
        assert_eq!(diag.location, Some(loc(10, 20)));
        assert!(diag.is_error());
    }

    #[test]
    fn diagnostic_display_with_labels() {
        let diag = Diagnostic::error(Category::TypeMismatch, "expected money, found integer")
            .with_label(loc(3, 7), "money expected here")
            .with_help("convert the operand");
        assert_snapshot!(diag.to_string(), @r"
        error[E0001]: expected money, found integer
          --> 0:3..7: money expected here
          help: convert the operand
        ");
    }

    #[test]
    fn error_shows_first_diagnostic() {
        let err = DiagnosticError::multiple(vec![
            Diagnostic::error(Category::UndefinedName, "unknown variable `x`"),
            Diagnostic::error(Category::Internal, "unreachable"),
        ]);
        assert_eq!(err.to_string(), "error[E0002]: unknown variable `x`");
        assert_eq!(err.first_category(), Some(Category::UndefinedName));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn category_metadata_is_stable_and_unique() {
        let mut codes = std::collections::BTreeSet::new();
        for cat in Category::all() {
            assert!(!cat.as_str().is_empty());
            assert!(!cat.description().is_empty());
            assert!(!cat.example_fix().is_empty());
            assert!(
                codes.insert(cat.code()),
                "duplicate diagnostic code detected: {}",
                cat.code()
            );
        }
    }
}
