pub mod auth_service;
pub mod task_service;

use std::collections::HashMap;
use validator::{ValidationError, ValidationErrors};

pub use auth_service::{AuthService, AuthServiceError, AuthSession, CredentialStore};
pub use task_service::{TaskService, TaskServiceError, TaskStore};

/// Flatten validator output into `field -> first message`.
pub fn field_errors(errors: &ValidationErrors) -> HashMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
        })
        .collect()
}

/// Rejects values made only of whitespace. Pair with a `length` rule for the
/// empty case.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
