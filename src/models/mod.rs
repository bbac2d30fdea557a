// Model exports
pub mod domain;
pub mod events;
pub mod requests;
pub mod responses;

pub use domain::{
    canonical_pair, CandidateCard, Gender, GenderPreference, MatchRecord, MatchStatus,
    MessageKind, MessageRecord, PreferenceRecord, ProfileRecord,
};
pub use events::{ClientEvent, MessagePayload, ServerEvent};
pub use requests::{BrowseQuery, HistoryQuery};
pub use responses::{
    ChatHistoryResponse, ErrorResponse, HealthResponse, LikeResponse, MatchSummary, PassResponse,
    UnmatchResponse,
};
