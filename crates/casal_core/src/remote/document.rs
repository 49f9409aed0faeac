//! Remote document shapes and boundary validation.
//!
//! # Responsibility
//! - Decode `users/{uid}`, `households/{id}` and `categories/{id}` documents
//!   into typed records.
//! - Encode typed records back into documents for writes.
//!
//! # Invariants
//! - Missing or mistyped required fields are `RecordError`s, never defaults.
//! - A decoded user's uid/email come from the provider identity.
//! - A decoded household always lists its owner as a member.

use crate::model::category::{CategoryRecord, CategoryValidationError};
use crate::model::household::{HouseholdRecord, HouseholdValidationError};
use crate::model::identity::Identity;
use crate::model::user::UserRecord;
use crate::remote::records::RecordKind;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Top-level fields of one remote document.
pub type Document = Map<String, Value>;

pub const FIELD_DISPLAY_NAME: &str = "displayName";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_HOUSEHOLD_ID: &str = "householdId";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_NAME: &str = "name";
pub const FIELD_OWNER_ID: &str = "ownerId";
pub const FIELD_MEMBER_IDS: &str = "memberIds";
/// Document key itself; not stored as a field.
pub const FIELD_ID: &str = "id";

// Older sign-up screens stored the profile name under this key.
const LEGACY_FIELD_FULL_NAME: &str = "fullName";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    MissingField {
        kind: RecordKind,
        field: &'static str,
    },
    InvalidField {
        kind: RecordKind,
        field: &'static str,
        reason: String,
    },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { kind, field } => {
                write!(f, "{} document is missing `{field}`", kind.as_str())
            }
            Self::InvalidField {
                kind,
                field,
                reason,
            } => write!(f, "{} document has invalid `{field}`: {reason}", kind.as_str()),
        }
    }
}

impl Error for RecordError {}

/// Decodes a user document fetched for `identity`.
pub fn decode_user(identity: &Identity, document: &Document) -> Result<UserRecord, RecordError> {
    const KIND: RecordKind = RecordKind::Users;

    let display_name = match optional_str(KIND, document, FIELD_DISPLAY_NAME)? {
        Some(value) => value,
        None => optional_str(KIND, document, LEGACY_FIELD_FULL_NAME)?.ok_or(
            RecordError::MissingField {
                kind: KIND,
                field: FIELD_DISPLAY_NAME,
            },
        )?,
    };

    let household_id = match optional_str(KIND, document, FIELD_HOUSEHOLD_ID)? {
        Some(value) if value.trim().is_empty() => None,
        other => other,
    };

    Ok(UserRecord {
        uid: identity.uid().to_string(),
        display_name,
        email: identity.email().to_string(),
        household_id,
    })
}

/// Decodes a household document stored under `id`.
pub fn decode_household(id: &str, document: &Document) -> Result<HouseholdRecord, RecordError> {
    const KIND: RecordKind = RecordKind::Households;

    let name = required_str(KIND, document, FIELD_NAME)?;
    let owner_id = required_str(KIND, document, FIELD_OWNER_ID)?;
    let created_at = required_i64(KIND, document, FIELD_CREATED_AT)?;

    let mut member_ids = BTreeSet::new();
    match document.get(FIELD_MEMBER_IDS) {
        None | Some(Value::Null) => {}
        Some(Value::Array(values)) => {
            for value in values {
                let member = value.as_str().ok_or_else(|| RecordError::InvalidField {
                    kind: KIND,
                    field: FIELD_MEMBER_IDS,
                    reason: "expected an array of strings".to_string(),
                })?;
                member_ids.insert(member.to_string());
            }
        }
        Some(_) => {
            return Err(RecordError::InvalidField {
                kind: KIND,
                field: FIELD_MEMBER_IDS,
                reason: "expected an array of strings".to_string(),
            });
        }
    }
    member_ids.insert(owner_id.clone());

    let household = HouseholdRecord {
        id: id.to_string(),
        name,
        owner_id,
        member_ids,
        created_at,
    };
    household.validate().map_err(|err| {
        let field = match err {
            HouseholdValidationError::EmptyId => FIELD_ID,
            HouseholdValidationError::EmptyName => FIELD_NAME,
            HouseholdValidationError::OwnerNotMember { .. } => FIELD_MEMBER_IDS,
        };
        RecordError::InvalidField {
            kind: KIND,
            field,
            reason: err.to_string(),
        }
    })?;
    Ok(household)
}

/// Decodes a category document stored under `id`.
pub fn decode_category(id: &str, document: &Document) -> Result<CategoryRecord, RecordError> {
    const KIND: RecordKind = RecordKind::Categories;

    let category = CategoryRecord {
        id: id.to_string(),
        name: required_str(KIND, document, FIELD_NAME)?.trim().to_string(),
        household_id: required_str(KIND, document, FIELD_HOUSEHOLD_ID)?,
        created_at: required_i64(KIND, document, FIELD_CREATED_AT)?,
    };
    category.validate().map_err(|err| {
        let field = match err {
            CategoryValidationError::EmptyId => FIELD_ID,
            CategoryValidationError::EmptyName => FIELD_NAME,
            CategoryValidationError::EmptyHouseholdId => FIELD_HOUSEHOLD_ID,
        };
        RecordError::InvalidField {
            kind: KIND,
            field,
            reason: err.to_string(),
        }
    })?;
    Ok(category)
}

/// Builds a full user document for `set_record`.
pub fn user_document(display_name: &str, email: &str, created_at: i64) -> Document {
    let mut document = Document::new();
    document.insert(FIELD_DISPLAY_NAME.to_string(), Value::from(display_name));
    document.insert(FIELD_EMAIL.to_string(), Value::from(email));
    document.insert(FIELD_CREATED_AT.to_string(), Value::from(created_at));
    document
}

/// Builds a full household document for `set_record`.
pub fn household_document(household: &HouseholdRecord) -> Document {
    let mut document = Document::new();
    document.insert(FIELD_NAME.to_string(), Value::from(household.name.as_str()));
    document.insert(
        FIELD_OWNER_ID.to_string(),
        Value::from(household.owner_id.as_str()),
    );
    document.insert(FIELD_MEMBER_IDS.to_string(), member_ids_value(&household.member_ids));
    document.insert(FIELD_CREATED_AT.to_string(), Value::from(household.created_at));
    document
}

/// Builds a full category document for `set_record`.
pub fn category_document(category: &CategoryRecord) -> Document {
    let mut document = Document::new();
    document.insert(FIELD_NAME.to_string(), Value::from(category.name.as_str()));
    document.insert(
        FIELD_HOUSEHOLD_ID.to_string(),
        Value::from(category.household_id.as_str()),
    );
    document.insert(FIELD_CREATED_AT.to_string(), Value::from(category.created_at));
    document
}

/// Single-field partial document.
pub fn partial(field: &str, value: Value) -> Document {
    let mut document = Document::new();
    document.insert(field.to_string(), value);
    document
}

pub fn member_ids_value(member_ids: &BTreeSet<String>) -> Value {
    Value::Array(member_ids.iter().cloned().map(Value::from).collect())
}

fn required_str(
    kind: RecordKind,
    document: &Document,
    field: &'static str,
) -> Result<String, RecordError> {
    optional_str(kind, document, field)?.ok_or(RecordError::MissingField { kind, field })
}

fn required_i64(
    kind: RecordKind,
    document: &Document,
    field: &'static str,
) -> Result<i64, RecordError> {
    document
        .get(field)
        .ok_or(RecordError::MissingField { kind, field })?
        .as_i64()
        .ok_or_else(|| RecordError::InvalidField {
            kind,
            field,
            reason: "expected epoch milliseconds".to_string(),
        })
}

fn optional_str(
    kind: RecordKind,
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, RecordError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(RecordError::InvalidField {
            kind,
            field,
            reason: "expected a string".to_string(),
        }),
    }
}
