// Service exports
pub mod auth;
pub mod cache;
pub mod coordinator;
pub mod directory;
pub mod moderation;
pub mod store;

pub use auth::{AuthedUser, TokenVerifier};
pub use cache::{CacheKey, CacheManager};
pub use coordinator::{CoordinatorError, LikeMatchCoordinator, LikeOutcome};
pub use directory::{DirectoryClient, DirectoryError};
pub use moderation::{ModerationClient, ModerationVerdict};
pub use store::{InsertOutcome, MatchInsert, PgRelationshipStore, RelationshipStore, StoreError};
