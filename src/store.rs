use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::{ProjectionInput, ProjectionResult};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("projection store lock poisoned")]
    Poisoned,
}

/// Latest projection saved for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProjection {
    pub user_id: String,
    pub input: ProjectionInput,
    pub result: ProjectionResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keeps at most one projection per user. Saving again replaces the previous
/// result; there is no history.
pub trait ProjectionStore: Send + Sync {
    fn upsert(
        &self,
        user_id: &str,
        input: ProjectionInput,
        result: ProjectionResult,
    ) -> Result<StoredProjection, StoreError>;

    fn latest(&self, user_id: &str) -> Result<Option<StoredProjection>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProjectionStore {
    records: RwLock<HashMap<String, StoredProjection>>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectionStore for InMemoryProjectionStore {
    fn upsert(
        &self,
        user_id: &str,
        input: ProjectionInput,
        result: ProjectionResult,
    ) -> Result<StoredProjection, StoreError> {
        let now = Utc::now();
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;

        let record = match records.entry(user_id.to_string()) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.input = input;
                existing.result = result;
                existing.updated_at = now;
                existing.clone()
            }
            Entry::Vacant(slot) => slot
                .insert(StoredProjection {
                    user_id: user_id.to_string(),
                    input,
                    result,
                    created_at: now,
                    updated_at: now,
                })
                .clone(),
        };
        Ok(record)
    }

    fn latest(&self, user_id: &str) -> Result<Option<StoredProjection>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProjectionEngine;

    fn sample_input(salary: f64) -> ProjectionInput {
        ProjectionInput {
            current_age: 35,
            retirement_age: 60,
            life_expectancy: 82,
            current_salary: salary,
            epf_balance: 40_000.0,
            prs_balance: 5_000.0,
            monthly_contribution_prs: 200.0,
            monthly_contribution_prs_percentage: 0.0,
            monthly_epf_contribution_rate: 23.0,
            employee_epf_contribution_rate: 11.0,
            target_monthly_income_input: None,
            pre_retirement_return: 4.0,
            post_retirement_return: 4.0,
            inflation_rate: 3.0,
            enable_salary_increments: true,
            salary_increment_rate: 3.0,
        }
    }

    fn save(store: &InMemoryProjectionStore, user_id: &str, salary: f64) -> StoredProjection {
        let input = sample_input(salary);
        let result = ProjectionEngine::default()
            .compute(&input)
            .expect("valid inputs");
        store.upsert(user_id, input, result).expect("store available")
    }

    #[test]
    fn latest_is_none_for_unknown_user() {
        let store = InMemoryProjectionStore::new();
        assert!(store.latest("nobody").expect("store available").is_none());
    }

    #[test]
    fn upsert_replaces_previous_result_and_keeps_creation_time() {
        let store = InMemoryProjectionStore::new();
        let first = save(&store, "user-1", 4_000.0);
        let second = save(&store, "user-1", 6_000.0);

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let latest = store
            .latest("user-1")
            .expect("store available")
            .expect("record saved");
        assert_eq!(latest, second);
        assert_eq!(latest.input.current_salary, 6_000.0);
        assert_eq!(store.records.read().expect("lock").len(), 1);
    }

    #[test]
    fn users_are_stored_independently() {
        let store = InMemoryProjectionStore::new();
        save(&store, "user-1", 4_000.0);
        save(&store, "user-2", 9_000.0);

        let one = store.latest("user-1").expect("store available").expect("saved");
        let two = store.latest("user-2").expect("store available").expect("saved");
        assert_eq!(one.user_id, "user-1");
        assert_eq!(two.user_id, "user-2");
        assert!(two.result.last_drawn_salary > one.result.last_drawn_salary);
    }
}
