//! User directory: the join from reservations to gender buckets.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::gender::GenderBucket;
use crate::core::BookingResult;
use crate::util::serde::UserId;

/// Read access to users' normalised gender classification.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Gender bucket per user. Unknown users are absent; unclassifiable users map to `None`.
    async fn genders_of(
        &self,
        users: &[UserId],
    ) -> BookingResult<HashMap<UserId, Option<GenderBucket>>>;
}
