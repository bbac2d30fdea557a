use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{canonical_pair, MatchRecord, MatchStatus};
use crate::services::store::{InsertOutcome, MatchInsert, RelationshipStore, StoreError};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("cannot like yourself")]
    SelfLike,

    #[error("like already recorded")]
    AlreadyLiked,

    /// The match insert conflicted but the re-read still found nothing.
    /// That means the unique constraint fired for a row we cannot see,
    /// which indicates storage corruption; it must surface, never be
    /// swallowed.
    #[error("match row lost after insert conflict for pair ({low}, {high})")]
    MatchLost { low: Uuid, high: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a like request.
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub liked: bool,
    pub is_match: bool,
    pub match_id: Option<Uuid>,
}

impl LikeOutcome {
    fn one_way() -> Self {
        Self {
            liked: true,
            is_match: false,
            match_id: None,
        }
    }

    fn matched(record: &MatchRecord) -> Self {
        Self {
            liked: true,
            is_match: true,
            match_id: Some(record.id),
        }
    }
}

/// Resolves likes into matches.
///
/// Per ordered pair (A, B): no relation -> one-way like -> (B likes A) ->
/// mutual -> one canonical ACTIVE match. Unmatch flips the row to UNMATCHED;
/// a later mutual like reactivates the same row instead of inserting a
/// duplicate.
///
/// Concurrent mutual likes may both observe mutuality and race the match
/// insert. The storage unique constraint arbitrates: the loser's insert
/// reports a conflict, its committed like is left alone, and the existing
/// row is re-read so both callers report the same match id.
pub struct LikeMatchCoordinator {
    store: Arc<dyn RelationshipStore>,
}

impl LikeMatchCoordinator {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    pub async fn like(&self, from: Uuid, to: Uuid) -> Result<LikeOutcome, CoordinatorError> {
        if from == to {
            return Err(CoordinatorError::SelfLike);
        }

        match self.store.insert_like(from, to).await? {
            InsertOutcome::Created => {}
            InsertOutcome::AlreadyExists => return Err(CoordinatorError::AlreadyLiked),
        }

        if !self.store.has_like(to, from).await? {
            return Ok(LikeOutcome::one_way());
        }

        let record = self.resolve_mutual(from, to).await?;
        Ok(LikeOutcome::matched(&record))
    }

    /// Both directions are present; produce the single canonical match row.
    async fn resolve_mutual(&self, a: Uuid, b: Uuid) -> Result<MatchRecord, CoordinatorError> {
        let (low, high) = canonical_pair(a, b);

        if let Some(existing) = self.store.find_match(low, high).await? {
            return self.refresh_existing(existing).await;
        }

        match self.store.insert_match(low, high).await? {
            MatchInsert::Created(record) => {
                tracing::info!("match created: {} ({} <-> {})", record.id, low, high);
                Ok(record)
            }
            MatchInsert::Conflict => {
                // Another request created the row between our read and our
                // insert. The like we committed stays; adopt the winner's
                // row.
                match self.store.find_match(low, high).await? {
                    Some(existing) => self.refresh_existing(existing).await,
                    None => Err(CoordinatorError::MatchLost { low, high }),
                }
            }
        }
    }

    async fn refresh_existing(
        &self,
        existing: MatchRecord,
    ) -> Result<MatchRecord, CoordinatorError> {
        match existing.status {
            MatchStatus::Active => Ok(existing),
            MatchStatus::Unmatched => {
                let record = self.store.reactivate_match(existing.id).await?;
                tracing::info!("match reactivated: {}", record.id);
                Ok(record)
            }
        }
    }
}
