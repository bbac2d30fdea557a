use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile snapshot served by the profile directory.
///
/// The directory owns profile CRUD; this is a read-only view enriched with
/// the signals discovery needs (interests, liveness, trust score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    pub display_name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default = "default_trust_score")]
    pub trust_score: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default = "default_true")]
    pub is_complete: bool,
}

impl ProfileRecord {
    /// A candidate may be surfaced only when the account is live and the
    /// profile is filled out and not hidden.
    pub fn is_discoverable(&self) -> bool {
        self.is_active && self.is_visible && self.is_complete
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// New accounts start at the neutral midpoint of the 0-100 trust range.
fn default_trust_score() -> i32 {
    50
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

/// Search preferences kept by the preference store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub user_id: Uuid,
    #[serde(default = "default_min_age")]
    pub min_age: u8,
    #[serde(default = "default_max_age")]
    pub max_age: u8,
    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: u16,
    #[serde(default)]
    pub gender_preference: GenderPreference,
}

impl PreferenceRecord {
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            min_age: default_min_age(),
            max_age: default_max_age(),
            max_distance_km: default_max_distance_km(),
            gender_preference: GenderPreference::default(),
        }
    }
}

fn default_min_age() -> u8 {
    18
}

fn default_max_age() -> u8 {
    99
}

fn default_max_distance_km() -> u16 {
    50
}

/// Gender filter semantics: `both` means male or female (non-binary is
/// excluded); `all` disables the filter entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPreference {
    #[default]
    All,
    Both,
    Male,
    Female,
    NonBinary,
}

impl GenderPreference {
    pub fn allows(&self, gender: Gender) -> bool {
        match self {
            GenderPreference::All => true,
            GenderPreference::Both => matches!(gender, Gender::Male | Gender::Female),
            GenderPreference::Male => gender == Gender::Male,
            GenderPreference::Female => gender == Gender::Female,
            GenderPreference::NonBinary => gender == Gender::NonBinary,
        }
    }
}

/// Order a pair of user IDs so two-party relationships are always stored as
/// `(low, high)`. Uuid's `Ord` (byte order) is the total order; it matches
/// how PostgreSQL compares uuid columns, so the application and the DB CHECK
/// constraint agree.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Active,
    Unmatched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Active => "ACTIVE",
            MatchStatus::Unmatched => "UNMATCHED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(MatchStatus::Active),
            "UNMATCHED" => Some(MatchStatus::Unmatched),
            _ => None,
        }
    }
}

/// Canonical match row. One row per pair for the lifetime of the platform;
/// unmatch flips the status, a later mutual like flips it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub status: MatchStatus,
    pub matched_at: DateTime<Utc>,
    pub unmatched_at: Option<DateTime<Utc>>,
    pub unmatched_by: Option<Uuid>,
}

impl MatchRecord {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    pub fn other_user(&self, user_id: Uuid) -> Uuid {
        if self.user_low == user_id {
            self.user_high
        } else {
            self.user_low
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    Image,
    Gif,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "TEXT",
            MessageKind::Image => "IMAGE",
            MessageKind::Gif => "GIF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT" => Some(MessageKind::Text),
            "IMAGE" => Some(MessageKind::Image),
            "GIF" => Some(MessageKind::Gif),
            _ => None,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

/// Persisted chat message. `read_at` doubles as the read flag; `deleted_at`
/// is a soft delete, the row is never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Candidate card surfaced during discovery and in the match list.
///
/// `distance_km` and `match_score` are only populated by the discovery
/// pipeline; the match list leaves them unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateCard {
    pub user_id: Uuid,
    pub display_name: String,
    pub age: u8,
    pub gender: Gender,
    pub bio: Option<String>,
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub match_score: Option<f64>,
}

impl CandidateCard {
    pub fn from_profile(profile: &ProfileRecord) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name.clone(),
            age: profile.age,
            gender: profile.gender,
            bio: profile.bio.clone(),
            distance_km: None,
            interests: profile.interests.clone(),
            photos: profile.photos.clone(),
            match_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_orders_both_ways() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        assert_eq!(canonical_pair(a, b), (a, b));
        assert_eq!(canonical_pair(b, a), (a, b));
    }

    #[test]
    fn test_gender_preference_both_excludes_non_binary() {
        assert!(GenderPreference::Both.allows(Gender::Male));
        assert!(GenderPreference::Both.allows(Gender::Female));
        assert!(!GenderPreference::Both.allows(Gender::NonBinary));
    }

    #[test]
    fn test_gender_preference_all_allows_everyone() {
        assert!(GenderPreference::All.allows(Gender::Male));
        assert!(GenderPreference::All.allows(Gender::Female));
        assert!(GenderPreference::All.allows(Gender::NonBinary));
    }

    #[test]
    fn test_match_status_round_trip() {
        assert_eq!(MatchStatus::parse("ACTIVE"), Some(MatchStatus::Active));
        assert_eq!(MatchStatus::parse("UNMATCHED"), Some(MatchStatus::Unmatched));
        assert_eq!(MatchStatus::parse("bogus"), None);
        assert_eq!(MatchStatus::Active.as_str(), "ACTIVE");
    }

    #[test]
    fn test_match_record_other_user() {
        let (low, high) = (Uuid::from_u128(1), Uuid::from_u128(2));
        let record = MatchRecord {
            id: Uuid::new_v4(),
            user_low: low,
            user_high: high,
            status: MatchStatus::Active,
            matched_at: Utc::now(),
            unmatched_at: None,
            unmatched_by: None,
        };

        assert_eq!(record.other_user(low), high);
        assert_eq!(record.other_user(high), low);
        assert!(record.involves(low));
        assert!(!record.involves(Uuid::from_u128(3)));
    }
}
