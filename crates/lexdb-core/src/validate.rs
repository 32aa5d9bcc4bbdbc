//! Declarative row validation.
//!
//! Model classes declare [`ValidationRule`]s and apply them to rows before
//! persistence. Rules follow the usual helper semantics: presence checks a
//! column for existence and non-NULL; the others skip absent/NULL values so
//! presence remains the only rule that reports them.

use crate::error::{Error, Result, ValidationError};
use crate::row::Row;
use crate::value::Value;
use regex::Regex;

/// A single declarative validation.
#[derive(Debug, Clone)]
pub enum ValidationRule {
    /// Column must exist and be non-NULL.
    Presence { column: String },
    /// Text length must fall within the given bounds.
    Length {
        column: String,
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Text must match the pattern.
    Format { column: String, pattern: Regex },
    /// Text must be one of the allowed values.
    Inclusion {
        column: String,
        allowed: Vec<String>,
    },
}

impl ValidationRule {
    /// Presence rule for a column.
    pub fn presence(column: impl Into<String>) -> Self {
        ValidationRule::Presence {
            column: column.into(),
        }
    }

    /// Length rule for a column.
    pub fn length(column: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        ValidationRule::Length {
            column: column.into(),
            min,
            max,
        }
    }

    /// Format rule for a column; fails if the pattern does not compile.
    pub fn format(column: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            tracing::warn!(pattern = %pattern, error = %e, "invalid validation pattern");
            Error::Config(crate::error::ConfigError {
                message: format!("invalid validation pattern '{pattern}': {e}"),
                source: Some(Box::new(e)),
            })
        })?;
        Ok(ValidationRule::Format {
            column: column.into(),
            pattern,
        })
    }

    /// Inclusion rule for a column.
    pub fn inclusion<I, S>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationRule::Inclusion {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// The column this rule applies to.
    pub fn column(&self) -> &str {
        match self {
            ValidationRule::Presence { column }
            | ValidationRule::Length { column, .. }
            | ValidationRule::Format { column, .. }
            | ValidationRule::Inclusion { column, .. } => column,
        }
    }

    fn apply(&self, row: &Row, errors: &mut ValidationError) {
        match self {
            ValidationRule::Presence { column } => match row.get_by_name(column) {
                None | Some(Value::Null) => errors.add_presence(column),
                Some(_) => {}
            },
            ValidationRule::Length { column, min, max } => {
                if let Some(text) = text_value(row, column) {
                    let len = text.chars().count();
                    if let Some(min) = min {
                        if len < *min {
                            errors.add_length(
                                column,
                                format!("must be at least {min} characters, got {len}"),
                            );
                        }
                    }
                    if let Some(max) = max {
                        if len > *max {
                            errors.add_length(
                                column,
                                format!("must be at most {max} characters, got {len}"),
                            );
                        }
                    }
                }
            }
            ValidationRule::Format { column, pattern } => {
                if let Some(text) = text_value(row, column) {
                    if !pattern.is_match(text) {
                        errors.add_format(column, pattern.as_str());
                    }
                }
            }
            ValidationRule::Inclusion { column, allowed } => {
                if let Some(text) = text_value(row, column) {
                    if !allowed.iter().any(|a| a == text) {
                        errors.add_inclusion(column, allowed);
                    }
                }
            }
        }
    }
}

fn text_value<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get_by_name(column).and_then(Value::as_str)
}

/// Apply every rule to a row, accumulating all failures.
pub fn validate_row(rules: &[ValidationRule], row: &Row) -> std::result::Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    for rule in rules {
        rule.apply(row, &mut errors);
    }
    errors.into_result()
}
