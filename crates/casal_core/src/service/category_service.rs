//! Household category use-cases.
//!
//! # Invariants
//! - Categories are read and written only for the household the session
//!   currently resolves to.
//! - Category writes never change the session; no refresh is needed.

use crate::model::category::CategoryRecord;
use crate::model::household::HouseholdId;
use crate::remote::document::{category_document, decode_category, FIELD_HOUSEHOLD_ID};
use crate::remote::{RecordKind, RecordStore};
use crate::service::now_epoch_ms;
use crate::session::{SessionError, SessionReconciler, SessionResult};
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

pub struct CategoryService {
    store: Arc<dyn RecordStore>,
    reconciler: Arc<SessionReconciler>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn RecordStore>, reconciler: Arc<SessionReconciler>) -> Self {
        Self { store, reconciler }
    }

    /// Lists the current household's categories, oldest first.
    ///
    /// Documents failing validation are skipped with a warning.
    pub fn list_categories(&self) -> SessionResult<Vec<CategoryRecord>> {
        let household_id = self.current_household_id()?;
        let documents =
            self.store
                .query_records(RecordKind::Categories, FIELD_HOUSEHOLD_ID, &household_id)?;

        let mut categories = documents
            .iter()
            .filter_map(|(id, document)| match decode_category(id, document) {
                Ok(category) => Some(category),
                Err(err) => {
                    warn!(
                        "event=category_list module=service status=skipped category_id={} error={}",
                        id, err
                    );
                    None
                }
            })
            .collect::<Vec<_>>();
        categories.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    /// Adds one category to the current household.
    pub fn add_category(&self, name: &str) -> SessionResult<CategoryRecord> {
        let household_id = self.current_household_id()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidInput(
                "category name is required".to_string(),
            ));
        }

        let category = CategoryRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            household_id,
            created_at: now_epoch_ms(),
        };
        self.store.set_record(
            RecordKind::Categories,
            &category.id,
            category_document(&category),
        )?;
        info!(
            "event=category_add module=service status=ok household_id={} category_id={}",
            category.household_id, category.id
        );
        Ok(category)
    }

    fn current_household_id(&self) -> SessionResult<HouseholdId> {
        let state = self.reconciler.snapshot();
        if !state.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        state
            .household_record()
            .map(|household| household.id.clone())
            .ok_or(SessionError::HouseholdUnresolved)
    }
}
