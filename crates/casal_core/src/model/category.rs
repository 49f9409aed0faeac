//! Household-scoped spending category.
//!
//! # Invariants
//! - Every category belongs to exactly one household.
//! - Names are trimmed and non-empty.

use crate::model::household::HouseholdId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub household_id: HouseholdId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyId,
    EmptyName,
    EmptyHouseholdId,
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "category id must not be empty"),
            Self::EmptyName => write!(f, "category name must not be empty"),
            Self::EmptyHouseholdId => write!(f, "category household_id must not be empty"),
        }
    }
}

impl Error for CategoryValidationError {}

impl CategoryRecord {
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.id.trim().is_empty() {
            return Err(CategoryValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::EmptyName);
        }
        if self.household_id.trim().is_empty() {
            return Err(CategoryValidationError::EmptyHouseholdId);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryRecord, CategoryValidationError};

    #[test]
    fn validate_requires_name_and_household() {
        let mut category = CategoryRecord {
            id: "c-1".to_string(),
            name: "Mercado".to_string(),
            household_id: "h-1".to_string(),
            created_at: 0,
        };
        assert_eq!(category.validate(), Ok(()));

        category.name = "  ".to_string();
        assert_eq!(category.validate(), Err(CategoryValidationError::EmptyName));

        category.name = "Mercado".to_string();
        category.household_id.clear();
        assert_eq!(
            category.validate(),
            Err(CategoryValidationError::EmptyHouseholdId)
        );
    }
}
