//! Household create/join use-cases.
//!
//! # Invariants
//! - Households are addressed by a generated id referenced from the user
//!   document; ids are never derived from member emails.
//! - A flow succeeds only once the session shows the target household.

use crate::model::household::{HouseholdId, HouseholdRecord};
use crate::model::identity::Identity;
use crate::model::session::SessionState;
use crate::remote::document::{
    decode_household, household_document, member_ids_value, partial, FIELD_HOUSEHOLD_ID,
    FIELD_MEMBER_IDS,
};
use crate::remote::{RecordKind, RecordStore};
use crate::service::now_epoch_ms;
use crate::session::{SessionError, SessionReconciler, SessionResult};
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct HouseholdService {
    store: Arc<dyn RecordStore>,
    reconciler: Arc<SessionReconciler>,
}

impl HouseholdService {
    pub fn new(store: Arc<dyn RecordStore>, reconciler: Arc<SessionReconciler>) -> Self {
        Self { store, reconciler }
    }

    /// Creates a household owned by the signed-in user and assigns it.
    pub fn create_household(&self, name: &str) -> SessionResult<SessionState> {
        let identity = self.current_identity()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidInput(
                "household name is required".to_string(),
            ));
        }

        let household = HouseholdRecord::new(
            Uuid::new_v4().to_string(),
            name,
            identity.uid(),
            now_epoch_ms(),
        );
        self.store.set_record(
            RecordKind::Households,
            &household.id,
            household_document(&household),
        )?;
        info!(
            "event=household_create module=service status=household_written uid={} household_id={}",
            identity, household.id
        );

        self.assign_and_refresh(&identity, household.id)
    }

    /// Adds the signed-in user to an existing household by its id.
    pub fn join_household(&self, code: &str) -> SessionResult<SessionState> {
        let identity = self.current_identity()?;
        let household_id = code.trim();
        if household_id.is_empty() {
            return Err(SessionError::InvalidInput(
                "household code is required".to_string(),
            ));
        }

        let document = self
            .store
            .get_record(RecordKind::Households, household_id)?
            .ok_or_else(|| SessionError::HouseholdNotFound(household_id.to_string()))?;
        let mut household = decode_household(household_id, &document)?;

        if household.add_member(identity.uid()) {
            self.store.update_record(
                RecordKind::Households,
                household_id,
                partial(FIELD_MEMBER_IDS, member_ids_value(&household.member_ids)),
            )?;
        }
        info!(
            "event=household_join module=service status=member_written uid={} household_id={}",
            identity, household_id
        );

        self.assign_and_refresh(&identity, household.id)
    }

    fn assign_and_refresh(
        &self,
        identity: &Identity,
        household_id: HouseholdId,
    ) -> SessionResult<SessionState> {
        self.store.update_record(
            RecordKind::Users,
            identity.uid(),
            partial(FIELD_HOUSEHOLD_ID, Value::from(household_id.as_str())),
        )?;

        let state = self.reconciler.refresh_after_mutation(identity)?;
        let resolved = state
            .household_record()
            .is_some_and(|household| household.id == household_id);
        if !resolved {
            warn!(
                "event=household_refresh module=service status=unresolved uid={} household_id={}",
                identity, household_id
            );
            return Err(SessionError::HouseholdUnresolved);
        }
        Ok(state)
    }

    fn current_identity(&self) -> SessionResult<Identity> {
        self.reconciler
            .snapshot()
            .identity()
            .cloned()
            .ok_or(SessionError::NotAuthenticated)
    }
}
