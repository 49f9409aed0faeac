//! User profile record.
//!
//! # Invariants
//! - `uid` equals the owning `Identity::uid`.
//! - The cached copy is replaced wholesale on every successful fetch.

use crate::model::household::HouseholdId;
use crate::model::identity::Identity;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Read-through copy of the remote `users/{uid}` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    /// Weak reference to a household document; a lookup key only.
    pub household_id: Option<HouseholdId>,
}

/// Validation error for user record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUid,
    EmptyHouseholdId,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUid => write!(f, "user uid must not be empty"),
            Self::EmptyHouseholdId => write!(f, "user household_id must not be blank when set"),
        }
    }
}

impl Error for UserValidationError {}

impl UserRecord {
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.uid.trim().is_empty() {
            return Err(UserValidationError::EmptyUid);
        }
        if matches!(self.household_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(UserValidationError::EmptyHouseholdId);
        }
        Ok(())
    }

    /// Rebuilds the identity this record was fetched for.
    ///
    /// Used only for optimistic bootstrap hydration from the local cache.
    pub fn identity(&self) -> Identity {
        Identity::new(self.uid.clone(), self.email.clone())
    }

    pub fn belongs_to(&self, identity: &Identity) -> bool {
        self.uid == identity.uid()
    }
}

#[cfg(test)]
mod tests {
    use super::{UserRecord, UserValidationError};
    use crate::model::identity::Identity;

    fn user(household_id: Option<&str>) -> UserRecord {
        UserRecord {
            uid: "uid-1".to_string(),
            display_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            household_id: household_id.map(str::to_string),
        }
    }

    #[test]
    fn blank_household_reference_is_rejected() {
        assert_eq!(user(Some("h-1")).validate(), Ok(()));
        assert_eq!(user(None).validate(), Ok(()));
        assert_eq!(
            user(Some("  ")).validate(),
            Err(UserValidationError::EmptyHouseholdId)
        );
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(user(Some("h-1"))).expect("serialize");
        assert_eq!(json["displayName"], "Ana");
        assert_eq!(json["householdId"], "h-1");
    }

    #[test]
    fn belongs_only_to_matching_uid() {
        let record = user(None);
        assert!(record.belongs_to(&record.identity()));
        assert!(!record.belongs_to(&Identity::new("uid-2", "ana@example.com")));
    }
}
