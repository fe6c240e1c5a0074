//! Input validation for user-supplied names.

use crate::error::CoreError;

/// Maximum length of a task name.
const MAX_TASK_NAME_LEN: usize = 128;

/// Maximum length of a dataset name.
const MAX_DATASET_NAME_LEN: usize = 128;

/// Validate a task name: non-empty and bounded.
pub fn validate_task_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Task name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_TASK_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Task name must not exceed {MAX_TASK_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a dataset name.
///
/// The name doubles as a directory name on the worker side, so it is
/// restricted to alphanumeric, hyphen, underscore, and dot characters.
pub fn validate_dataset_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Dataset name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_DATASET_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Dataset name must not exceed {MAX_DATASET_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Dataset name may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}
