//! Due-task selection.

use crate::error::StoreError;
use crate::store::TaskStore;
use crate::task::Task;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskhook_core::Result;
use tracing::debug;

/// Loads the batch of tasks due at a given instant.
#[derive(Clone)]
pub struct DueTaskSelector {
    store: Arc<dyn TaskStore>,
}

impl DueTaskSelector {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Returns every active task with `scheduled_at <= now`, unbounded and
    /// unordered.
    ///
    /// # Errors
    ///
    /// Returns the store error; the cycle must then dispatch nothing.
    pub async fn select(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let tasks = self.store.find_due_tasks(now).await?;
        debug!(due = tasks.len(), %now, "selected due tasks");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::{Cadence, CadenceUnit};
    use crate::memory::InMemoryTaskStore;
    use crate::task::HttpMethod;
    use chrono::Duration;
    use std::collections::HashSet;
    use taskhook_core::ServiceId;

    #[tokio::test]
    async fn selection_is_idempotent() {
        let store = Arc::new(InMemoryTaskStore::new());
        let now = Utc::now();
        for offset in [-120, -5, 0, 30] {
            let task = Task::new(
                ServiceId::new(),
                "t",
                "http://example.test",
                HttpMethod::Get,
                Cadence::new(1, CadenceUnit::Hour).unwrap(),
            )
            .unwrap()
            .scheduled_at(now + Duration::minutes(offset));
            store.insert_task(task);
        }
        let selector = DueTaskSelector::new(store);

        let first: HashSet<_> = selector.select(now).await.unwrap().iter().map(|t| t.id).collect();
        let second: HashSet<_> = selector.select(now).await.unwrap().iter().map(|t| t.id).collect();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }
}
