//! Validation helpers for `issue_tracker`.
//!
//! These routines enforce the issue data constraints and return structured
//! validation errors without touching storage. Type-level checks (wrong JSON
//! type, unknown enum value, missing field) already happened during
//! deserialization; what remains here is content: emptiness and length.

use crate::error::ValidationError;
use crate::model::IssueFields;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Longest accepted reporter or assignee, in characters.
pub const MAX_PERSON_CHARS: usize = 100;
/// Largest accepted description, in bytes.
pub const MAX_DESCRIPTION_BYTES: usize = 102_400;

/// Validates issue fields and invariants.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate a full set of issue fields and return every error found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(fields: &IssueFields) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = [
            check_title(&fields.title),
            check_reporter(&fields.reporter),
            fields.description.as_deref().and_then(check_description),
            fields.assignee.as_deref().and_then(check_assignee),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Title: required, not blank, at most 200 characters.
#[must_use]
pub fn check_title(title: &str) -> Option<ValidationError> {
    check_required_text("title", title, MAX_TITLE_CHARS)
}

/// Reporter: required, not blank, at most 100 characters.
#[must_use]
pub fn check_reporter(reporter: &str) -> Option<ValidationError> {
    check_required_text("reporter", reporter, MAX_PERSON_CHARS)
}

/// Assignee: optional, at most 100 characters.
#[must_use]
pub fn check_assignee(assignee: &str) -> Option<ValidationError> {
    (assignee.chars().count() > MAX_PERSON_CHARS).then(|| {
        ValidationError::new(
            "assignee",
            format!("exceeds {MAX_PERSON_CHARS} characters"),
        )
    })
}

/// Description: optional, at most 100KB.
#[must_use]
pub fn check_description(description: &str) -> Option<ValidationError> {
    (description.len() > MAX_DESCRIPTION_BYTES)
        .then(|| ValidationError::new("description", "exceeds 100KB"))
}

fn check_required_text(field: &str, value: &str, max_chars: usize) -> Option<ValidationError> {
    if value.trim().is_empty() {
        return Some(ValidationError::new(field, "cannot be empty"));
    }
    if value.chars().count() > max_chars {
        return Some(ValidationError::new(
            field,
            format!("exceeds {max_chars} characters"),
        ));
    }
    None
}

/// Blank optional text means "no value".
///
/// Keeps stored optional columns either NULL or meaningful, so filters on
/// `assignee` never have to special-case empty strings.
#[must_use]
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str, reporter: &str) -> IssueFields {
        IssueFields::new(title, reporter)
    }

    #[test]
    fn valid_fields_pass() {
        assert!(IssueValidator::validate(&fields("Login fails", "alice@example.com")).is_ok());
    }

    #[test]
    fn blank_title_and_reporter_are_both_reported() {
        let errors = IssueValidator::validate(&fields("   ", "")).unwrap_err();
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec!["title", "reporter"]);
        assert!(errors.iter().all(|e| e.message == "cannot be empty"));
    }

    #[test]
    fn title_length_is_counted_in_characters() {
        let exactly = "é".repeat(MAX_TITLE_CHARS);
        assert!(check_title(&exactly).is_none());

        let too_long = "x".repeat(MAX_TITLE_CHARS + 1);
        let err = check_title(&too_long).unwrap();
        assert_eq!(err.message, "exceeds 200 characters");
    }

    #[test]
    fn oversized_optional_fields_rejected() {
        let mut f = fields("t", "r");
        f.description = Some("d".repeat(MAX_DESCRIPTION_BYTES + 1));
        f.assignee = Some("a".repeat(MAX_PERSON_CHARS + 1));
        let errors = IssueValidator::validate(&f).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "description");
        assert_eq!(errors[1].field, "assignee");
    }

    #[test]
    fn normalize_blank_optional_text() {
        assert_eq!(normalize_optional_text(Some(String::new())), None);
        assert_eq!(normalize_optional_text(Some("  \t".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some(" bob ".to_string())),
            Some(" bob ".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }
}
