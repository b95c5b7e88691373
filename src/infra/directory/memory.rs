//! In-memory user directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::directory::UserDirectory;
use crate::core::gender::GenderBucket;
use crate::core::BookingResult;
use crate::util::serde::UserId;

/// Users and their normalised gender, held in memory.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, Option<GenderBucket>>>>,
}

impl InMemoryUserDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with an already normalised bucket.
    pub fn insert(&self, user: UserId, gender: Option<GenderBucket>) {
        self.users.write().insert(user, gender);
    }

    /// Register a user from a raw profile value such as `"Mujer"`.
    pub fn insert_raw(&self, user: UserId, raw_gender: &str) {
        self.insert(user, GenderBucket::classify(raw_gender));
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn genders_of(
        &self,
        users: &[UserId],
    ) -> BookingResult<HashMap<UserId, Option<GenderBucket>>> {
        let known = self.users.read();
        Ok(users
            .iter()
            .filter_map(|id| known.get(id).map(|gender| (*id, *gender)))
            .collect())
    }
}
