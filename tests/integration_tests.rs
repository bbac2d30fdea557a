// Integration tests for Amora core: the discovery pipeline end to end, the
// like/match protocol against an in-memory store, and registry fan-out.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use amora_core::core::{ExclusionSets, Matcher};
use amora_core::models::{
    canonical_pair, Gender, GenderPreference, MatchRecord, MatchStatus, PreferenceRecord,
    ProfileRecord, ServerEvent,
};
use amora_core::realtime::ConnectionRegistry;
use amora_core::services::store::{InsertOutcome, MatchInsert, RelationshipStore, StoreError};
use amora_core::services::LikeMatchCoordinator;

fn profile(id: u128, age: u8, gender: Gender, lat: f64, lon: f64) -> ProfileRecord {
    ProfileRecord {
        user_id: Uuid::from_u128(id),
        display_name: format!("user-{}", id),
        age,
        gender,
        bio: Some("hi".to_string()),
        interests: vec!["hiking".to_string()],
        photos: vec!["p.jpg".to_string()],
        latitude: Some(lat),
        longitude: Some(lon),
        last_active: Some(Utc::now() - Duration::hours(2)),
        trust_score: 60,
        is_active: true,
        is_visible: true,
        is_complete: true,
    }
}

// ---------------------------------------------------------------- discovery

#[test]
fn test_discovery_pipeline_end_to_end() {
    let matcher = Matcher::new();
    let now = Utc::now();

    let mut viewer = profile(1000, 30, Gender::Male, 25.033, 121.5654);
    viewer.interests = vec!["hiking".to_string(), "film".to_string()];

    let preferences = PreferenceRecord {
        user_id: viewer.user_id,
        min_age: 21,
        max_age: 35,
        max_distance_km: 50,
        gender_preference: GenderPreference::Female,
    };

    let candidates = vec![
        profile(1, 25, Gender::Female, 25.04, 121.56),  // near, good
        profile(2, 28, Gender::Female, 25.25, 121.75),  // farther
        profile(3, 40, Gender::Female, 25.04, 121.56),  // too old
        profile(4, 25, Gender::Male, 25.04, 121.56),    // wrong gender
        profile(5, 25, Gender::Female, 27.0, 123.0),    // out of range
    ];

    let result = matcher.rank(
        &viewer,
        &preferences,
        &ExclusionSets::default(),
        candidates,
        10,
        now,
    );

    assert_eq!(result.total_considered, 5);
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.candidates[0].profile.user_id, Uuid::from_u128(1));
    // Descending by score
    assert!(result.candidates[0].score >= result.candidates[1].score);
}

#[test]
fn test_discovery_overfetch_truncation() {
    let matcher = Matcher::new();
    let viewer = profile(1000, 30, Gender::Male, 25.033, 121.5654);
    let preferences = PreferenceRecord {
        user_id: viewer.user_id,
        min_age: 18,
        max_age: 99,
        max_distance_km: 50,
        gender_preference: GenderPreference::All,
    };

    // 3x over-fetch feeding a limit of 20
    let candidates: Vec<ProfileRecord> = (1..=60)
        .map(|i| profile(i, 25 + (i % 15) as u8, Gender::Female, 25.04, 121.56))
        .collect();

    let result = matcher.rank(
        &viewer,
        &preferences,
        &ExclusionSets::default(),
        candidates,
        20,
        Utc::now(),
    );

    assert_eq!(result.candidates.len(), 20);
    assert_eq!(result.total_considered, 60);
}

// ------------------------------------------------------------- like / match

/// Minimal in-memory store with database-equivalent uniqueness.
struct MemoryStore {
    likes: Mutex<HashSet<(Uuid, Uuid)>>,
    matches: Mutex<HashMap<(Uuid, Uuid), MatchRecord>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            likes: Mutex::new(HashSet::new()),
            matches: Mutex::new(HashMap::new()),
        }
    }

    fn unmatch_all(&self, by: Uuid) {
        let mut matches = self.matches.lock().unwrap();
        for record in matches.values_mut() {
            record.status = MatchStatus::Unmatched;
            record.unmatched_at = Some(Utc::now());
            record.unmatched_by = Some(by);
        }
    }

    fn clear_likes(&self) {
        self.likes.lock().unwrap().clear();
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn insert_like(&self, from: Uuid, to: Uuid) -> Result<InsertOutcome, StoreError> {
        if self.likes.lock().unwrap().insert((from, to)) {
            Ok(InsertOutcome::Created)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn has_like(&self, from: Uuid, to: Uuid) -> Result<bool, StoreError> {
        Ok(self.likes.lock().unwrap().contains(&(from, to)))
    }

    async fn find_match(
        &self,
        user_low: Uuid,
        user_high: Uuid,
    ) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self
            .matches
            .lock()
            .unwrap()
            .get(&(user_low, user_high))
            .cloned())
    }

    async fn insert_match(
        &self,
        user_low: Uuid,
        user_high: Uuid,
    ) -> Result<MatchInsert, StoreError> {
        let mut matches = self.matches.lock().unwrap();
        if matches.contains_key(&(user_low, user_high)) {
            return Ok(MatchInsert::Conflict);
        }
        let record = MatchRecord {
            id: Uuid::new_v4(),
            user_low,
            user_high,
            status: MatchStatus::Active,
            matched_at: Utc::now(),
            unmatched_at: None,
            unmatched_by: None,
        };
        matches.insert((user_low, user_high), record.clone());
        Ok(MatchInsert::Created(record))
    }

    async fn reactivate_match(&self, match_id: Uuid) -> Result<MatchRecord, StoreError> {
        let mut matches = self.matches.lock().unwrap();
        let record = matches
            .values_mut()
            .find(|m| m.id == match_id)
            .expect("unknown match");
        record.status = MatchStatus::Active;
        record.matched_at = Utc::now();
        record.unmatched_at = None;
        record.unmatched_by = None;
        Ok(record.clone())
    }
}

#[tokio::test]
async fn test_full_like_match_unmatch_rematch_cycle() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = LikeMatchCoordinator::new(store.clone());
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);

    // One-way like
    let first = coordinator.like(a, b).await.unwrap();
    assert!(first.liked && !first.is_match);

    // Mutual like -> exactly one canonical match
    let second = coordinator.like(b, a).await.unwrap();
    assert!(second.is_match);
    let match_id = second.match_id.unwrap();

    {
        let matches = store.matches.lock().unwrap();
        assert_eq!(matches.len(), 1);
        let record = matches.values().next().unwrap();
        assert!(record.user_low < record.user_high);
        assert_eq!((record.user_low, record.user_high), canonical_pair(a, b));
    }

    // Unmatch, then a fresh mutual like cycle
    store.unmatch_all(a);
    store.clear_likes();

    coordinator.like(a, b).await.unwrap();
    let again = coordinator.like(b, a).await.unwrap();

    // Reactivated in place: same row id, ACTIVE again, metadata cleared
    assert_eq!(again.match_id.unwrap(), match_id);
    let matches = store.matches.lock().unwrap();
    assert_eq!(matches.len(), 1);
    let record = matches.values().next().unwrap();
    assert_eq!(record.status, MatchStatus::Active);
    assert!(record.unmatched_at.is_none());
}

#[tokio::test]
async fn test_many_pairs_keep_one_row_each() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = Arc::new(LikeMatchCoordinator::new(store.clone()));

    let mut tasks = Vec::new();
    for i in 0..10u128 {
        let a = Uuid::from_u128(100 + i);
        let b = Uuid::from_u128(200 + i);
        let c1 = coordinator.clone();
        let c2 = coordinator.clone();
        tasks.push(tokio::spawn(async move { c1.like(a, b).await }));
        tasks.push(tokio::spawn(async move { c2.like(b, a).await }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    let matches = store.matches.lock().unwrap();
    assert_eq!(matches.len(), 10);
    for record in matches.values() {
        assert!(record.user_low < record.user_high);
        assert_eq!(record.status, MatchStatus::Active);
    }
}

// ------------------------------------------------------------------ realtime

fn connect(registry: &ConnectionRegistry, user: Uuid) -> mpsc::UnboundedReceiver<ServerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(user, tx);
    rx
}

#[tokio::test]
async fn test_room_fanout_lifecycle() {
    let registry = ConnectionRegistry::new();
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    let room = Uuid::from_u128(42);

    let mut rx_a = connect(&registry, a);
    let mut rx_b = connect(&registry, b);
    registry.join(room, a);
    registry.join(room, b);

    // Both members receive a room broadcast
    registry.broadcast(room, ServerEvent::NotificationLiked, None);
    assert!(rx_a.try_recv().is_ok());
    assert!(rx_b.try_recv().is_ok());

    // After a disconnects, broadcasts reach only b
    registry.unregister(a);
    registry.broadcast(room, ServerEvent::NotificationLiked, None);
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_ok());

    // a's membership is gone even if a new broadcast names the old room
    assert!(!registry.is_in_room(room, a));
    assert!(registry.is_in_room(room, b));
}

#[tokio::test]
async fn test_disconnect_during_send_does_not_disturb_others() {
    let registry = ConnectionRegistry::new();
    let gone = Uuid::from_u128(1);
    let alive = Uuid::from_u128(2);
    let room = Uuid::from_u128(42);

    let rx_gone = connect(&registry, gone);
    let mut rx_alive = connect(&registry, alive);
    registry.join(room, gone);
    registry.join(room, alive);

    // Simulate a transport failure for one member
    drop(rx_gone);

    registry.broadcast(room, ServerEvent::NotificationLiked, None);

    // The failed member was demoted to a disconnect; the other still
    // received the event
    assert!(!registry.is_online(gone));
    assert!(rx_alive.try_recv().is_ok());
}
