//! Generated entity codes
//!
//! Asset codes are the category prefix plus a six-digit counter
//! (`LA000042`), staff codes are `SD` plus four digits. Each prefix owns one
//! counter row; allocation bumps it under optimistic locking and retries on
//! contention, so concurrent callers get distinct, gap-free values.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::code_count::CodeCount,
    store::{ChangeSet, CommitError, Store},
};

const MAX_ATTEMPTS: u32 = 16;

#[derive(Clone)]
pub struct CodeService {
    store: Arc<dyn Store>,
}

impl CodeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn next_asset_code(&self, prefix: &str) -> AppResult<String> {
        let value = self.next_value(prefix).await?;
        Ok(format!("{prefix}{value:06}"))
    }

    pub async fn next_staff_code(&self) -> AppResult<String> {
        let value = self.next_value("SD").await?;
        Ok(format!("SD{value:04}"))
    }

    /// Claim the next counter value for a prefix. The counter row is created
    /// lazily on first use; a lost race on either path is retried with a
    /// short jittered backoff.
    async fn next_value(&self, key: &str) -> AppResult<i64> {
        for attempt in 0..MAX_ATTEMPTS {
            let result = match self.store.get_code_count(key).await? {
                Some(mut count) => {
                    count.last_value += 1;
                    let value = count.last_value;
                    self.store
                        .commit(ChangeSet::new().update_code_count(count))
                        .await
                        .map(|_| value)
                }
                None => {
                    let count = CodeCount::first(key);
                    let value = count.last_value;
                    self.store
                        .commit(ChangeSet::new().insert_code_count(count))
                        .await
                        .map(|_| value)
                }
            };

            match result {
                Ok(value) => return Ok(value),
                Err(CommitError::Conflict(_)) | Err(CommitError::Duplicate(_)) => {
                    tracing::debug!(key, attempt, "code counter contention, retrying");
                    let jitter: u64 = rand::thread_rng().gen_range(0..8);
                    tokio::time::sleep(Duration::from_millis(u64::from(attempt) * 2 + jitter))
                        .await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Transient(format!(
            "could not allocate a code for prefix {key}, please retry"
        )))
    }
}
