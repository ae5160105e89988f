//! Form-level validation shared by categories, articles and gallery photos.
//!
//! Checks never stop at the first problem: each entity's `validate` collects
//! every [`FieldError`] so an editor sees all of them at once.

use thiserror::Error;

/// One rejected field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All errors found while validating one form.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", join_fields(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` if nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Non-empty, at most `max` characters (not bytes).
    pub fn check_text(&mut self, field: &'static str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.push(field, "this field is required");
        } else {
            self.check_max_chars(field, value, max);
        }
    }

    pub fn check_max_chars(&mut self, field: &'static str, value: &str, max: usize) {
        let len = value.chars().count();
        if len > max {
            self.push(
                field,
                format!("ensure this value has at most {max} characters (it has {len})"),
            );
        }
    }

    /// The file name's extension must be one of `allowed` (case-insensitive).
    pub fn check_extension(&mut self, field: &'static str, file_name: &str, allowed: &[String]) {
        if !has_allowed_extension(file_name, allowed) {
            let ext = extension(file_name).unwrap_or("");
            self.push(
                field,
                format!(
                    "file extension \"{ext}\" is not allowed; allowed extensions are: {}",
                    allowed.join(", ")
                ),
            );
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    parts.join("; ")
}

fn extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() { None } else { Some(ext) }
}

pub fn has_allowed_extension(file_name: &str, allowed: &[String]) -> bool {
    extension(file_name).is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}
