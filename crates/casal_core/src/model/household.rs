//! Household record.
//!
//! # Invariants
//! - `member_ids` always contains `owner_id`.
//! - A household outlives any single member; users only hold its id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Household document identifier.
///
/// New households get a UUID; ids read back from the store are opaque.
pub type HouseholdId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdRecord {
    pub id: HouseholdId,
    pub name: String,
    pub owner_id: String,
    pub member_ids: BTreeSet<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HouseholdValidationError {
    EmptyId,
    EmptyName,
    OwnerNotMember { owner_id: String },
}

impl Display for HouseholdValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "household id must not be empty"),
            Self::EmptyName => write!(f, "household name must not be empty"),
            Self::OwnerNotMember { owner_id } => {
                write!(f, "household owner `{owner_id}` is missing from member_ids")
            }
        }
    }
}

impl Error for HouseholdValidationError {}

impl HouseholdRecord {
    /// Creates a household whose only member is its owner.
    pub fn new(
        id: impl Into<HouseholdId>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
        created_at: i64,
    ) -> Self {
        let owner_id = owner_id.into();
        Self {
            id: id.into(),
            name: name.into(),
            member_ids: BTreeSet::from([owner_id.clone()]),
            owner_id,
            created_at,
        }
    }

    /// Adds one member. Returns `false` when already present.
    pub fn add_member(&mut self, uid: impl Into<String>) -> bool {
        self.member_ids.insert(uid.into())
    }

    pub fn is_member(&self, uid: &str) -> bool {
        self.member_ids.contains(uid)
    }

    pub fn validate(&self) -> Result<(), HouseholdValidationError> {
        if self.id.trim().is_empty() {
            return Err(HouseholdValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(HouseholdValidationError::EmptyName);
        }
        if !self.member_ids.contains(&self.owner_id) {
            return Err(HouseholdValidationError::OwnerNotMember {
                owner_id: self.owner_id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HouseholdRecord, HouseholdValidationError};

    #[test]
    fn new_household_lists_owner_as_member() {
        let household = HouseholdRecord::new("h-1", "Casa", "u-owner", 1_700_000_000_000);
        assert!(household.is_member("u-owner"));
        assert_eq!(household.member_ids.len(), 1);
        household.validate().expect("fresh household should be valid");
    }

    #[test]
    fn add_member_is_set_like() {
        let mut household = HouseholdRecord::new("h-1", "Casa", "u-owner", 0);
        assert!(household.add_member("u-partner"));
        assert!(!household.add_member("u-partner"));
        assert_eq!(household.member_ids.len(), 2);
    }

    #[test]
    fn validate_rejects_owner_missing_from_members() {
        let mut household = HouseholdRecord::new("h-1", "Casa", "u-owner", 0);
        household.member_ids.clear();
        let err = household.validate().expect_err("owner must be a member");
        assert!(matches!(err, HouseholdValidationError::OwnerNotMember { .. }));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let household = HouseholdRecord::new("h-1", "  ", "u-owner", 0);
        assert_eq!(
            household.validate(),
            Err(HouseholdValidationError::EmptyName)
        );
    }
}
