//! In-memory record storage for one process.
//!
//! Records live in a `Vec` so listing returns them in insertion order.
//! Identifiers are always generated here, which keeps them unique.

use uuid::Uuid;

use crate::model::{User, UserFields};

#[derive(Debug, Default)]
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { users: Vec::new() }
    }

    pub fn list_all(&self) -> &[User] {
        &self.users
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Appends a new record under a freshly generated v4 identifier.
    pub fn insert(&mut self, fields: UserFields) -> User {
        let user = User::new(Uuid::new_v4(), fields);
        self.users.push(user.clone());
        user
    }

    /// Replaces every field but the identifier, keeping the record's position.
    pub fn replace_by_id(&mut self, id: Uuid, fields: UserFields) -> Option<User> {
        let user = self.users.iter_mut().find(|user| user.id == id)?;
        user.replace_fields(fields);
        Some(user.clone())
    }

    pub fn remove_by_id(&mut self, id: Uuid) -> Option<User> {
        let index = self.users.iter().position(|user| user.id == id)?;
        Some(self.users.remove(index))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
