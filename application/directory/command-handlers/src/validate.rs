use std::sync::LazyLock;

use directory_errors::DirectoryError;
use directory_models::UserDraft;
use regex::Regex;

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .unwrap()
});

/// Field checks shared by create and update. First failing field wins,
/// in a fixed order: handle presence, address presence, address shape.
/// The display name is free text and may be empty.
pub fn validate_draft(
    draft: &UserDraft,
) -> Result<(), DirectoryError> {
    if draft.handle.trim().is_empty() {
        return Err(DirectoryError::Validation {
            field: "handle",
            reason: "must not be empty",
        });
    }
    if draft.address.trim().is_empty() {
        return Err(DirectoryError::Validation {
            field: "address",
            reason: "must not be empty",
        });
    }
    if !ADDRESS_PATTERN.is_match(&draft.address) {
        return Err(DirectoryError::Validation {
            field: "address",
            reason: "must be a valid email address",
        });
    }
    Ok(())
}
