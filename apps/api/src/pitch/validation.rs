//! Structural checks on a `PitchRequest` before any provider call is made.

use thiserror::Error;

use crate::pitch::models::{PitchRequest, ValidatedPitchRequest};

pub const MAX_LIST_LENGTH: usize = 5;
pub const MAX_ITEM_LENGTH: usize = 100;

/// The first rule a request broke. `index` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{field}' must contain between 1 and 5 items (got {len})")]
    InvalidLength { field: &'static str, len: usize },

    #[error("'{field}' item {index} must be 100 characters or less (got {len})")]
    InvalidItem {
        field: &'static str,
        index: usize,
        len: usize,
    },

    #[error("'{field}' item {index} cannot be empty or whitespace only")]
    EmptyItem { field: &'static str, index: usize },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidLength { field, .. }
            | ValidationError::InvalidItem { field, .. }
            | ValidationError::EmptyItem { field, .. } => *field,
        }
    }

    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidLength { .. } => "INVALID_LENGTH",
            ValidationError::InvalidItem { .. } => "INVALID_ITEM",
            ValidationError::EmptyItem { .. } => "EMPTY_ITEM",
        }
    }
}

/// Validates all four lists in a fixed order and returns the trimmed request.
///
/// Fields are checked `characters`, `locations`, `genres`, `creatives`; the
/// list length is checked before its items. Nothing else is normalised.
pub fn validate(request: PitchRequest) -> Result<ValidatedPitchRequest, ValidationError> {
    Ok(ValidatedPitchRequest {
        characters: validate_list("characters", request.characters)?,
        locations: validate_list("locations", request.locations)?,
        genres: validate_list("genres", request.genres)?,
        creatives: validate_list("creatives", request.creatives)?,
    })
}

fn validate_list(field: &'static str, items: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if items.is_empty() || items.len() > MAX_LIST_LENGTH {
        return Err(ValidationError::InvalidLength {
            field,
            len: items.len(),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyItem { field, index });
            }
            let len = trimmed.chars().count();
            if len > MAX_ITEM_LENGTH {
                return Err(ValidationError::InvalidItem { field, index, len });
            }
            Ok(trimmed.to_string())
        })
        .collect()
}
