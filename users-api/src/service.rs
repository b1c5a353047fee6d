//! User operations on top of a [`UserStore`].
//!
//! The service owns its store behind an async mutex. Every public method
//! takes the lock for the whole operation, so an update's existence check,
//! validation and replacement happen atomically with respect to other requests.
//! Callers get owned copies of records, never references into the store.

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use crate::{
    error::ApiError,
    model::{User, UserId},
    store::UserStore,
    validator::validate,
};

/// Receives the full record list after each successful mutation.
pub type SnapshotSender = mpsc::UnboundedSender<Vec<User>>;

pub struct UserService {
    store: Mutex<UserStore>,
    snapshots: Option<SnapshotSender>,
}

impl UserService {
    pub fn new(store: UserStore) -> Self {
        Self {
            store: Mutex::new(store),
            snapshots: None,
        }
    }

    /// Publishes a snapshot to `sink` after every create, update and delete.
    pub fn with_snapshot_sink(mut self, sink: SnapshotSender) -> Self {
        self.snapshots = Some(sink);
        self
    }

    pub async fn list_all(&self) -> Vec<User> {
        self.store.lock().await.list_all().to_vec()
    }

    pub async fn get_by_id(&self, id: &UserId) -> Result<User, ApiError> {
        let store = self.store.lock().await;
        store
            .find_by_id(id.uuid())
            .cloned()
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn create(&self, input: &Value) -> Result<User, ApiError> {
        let fields = validate(input)?;
        let mut store = self.store.lock().await;
        let user = store.insert(fields);
        debug!(id = %user.id, "user created");
        self.publish(&store);
        Ok(user)
    }

    /// Replaces a user's fields. A missing id wins over an invalid payload.
    pub async fn update(&self, id: &UserId, input: &Value) -> Result<User, ApiError> {
        let mut store = self.store.lock().await;
        if store.find_by_id(id.uuid()).is_none() {
            return Err(user_not_found(id));
        }
        let fields = validate(input)?;
        let user = store
            .replace_by_id(id.uuid(), fields)
            .ok_or_else(|| user_not_found(id))?;
        debug!(%id, "user updated");
        self.publish(&store);
        Ok(user)
    }

    pub async fn remove(&self, id: &UserId) -> Result<(), ApiError> {
        let mut store = self.store.lock().await;
        store
            .remove_by_id(id.uuid())
            .ok_or_else(|| user_not_found(id))?;
        debug!(%id, "user removed");
        self.publish(&store);
        Ok(())
    }

    /// Copies the current record list.
    pub async fn snapshot(&self) -> Vec<User> {
        self.list_all().await
    }

    fn publish(&self, store: &UserStore) {
        let Some(sink) = &self.snapshots else {
            return;
        };
        if let Err(error) = sink.send(store.list_all().to_vec()) {
            warn!(records = error.0.len(), "snapshot sink closed; dropping snapshot");
        }
    }
}

fn user_not_found(id: &UserId) -> ApiError {
    ApiError::not_found(format!("User with id {id} doesn't exist"))
}
