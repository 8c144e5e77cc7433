//! Integration tests for the pairing-room service
//!
//! These tests drive the public API end to end:
//! - Pairing lifecycle from enqueue through rating and cleanup
//! - The HTTP session creator against a stub execution engine
//! - Rollback when session creation fails
//! - Queue properties over random operation sequences

mod fixtures;

use httpmock::prelude::*;
use pairing_room::error::MatchmakingError;
use pairing_room::matchmaking::MatchmakingEngine;
use pairing_room::rating::{InMemoryRatingStorage, RatingService, RatingStorage};
use pairing_room::session::{HttpSessionCreator, HttpSessionCreatorConfig, RecordingSessionCreator};
use pairing_room::types::{MatchOutcome, PairingStatus, ParticipantStatus, QueueStats};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fixtures::FlakySessionCreator;

fn create_test_system() -> (MatchmakingEngine, Arc<RecordingSessionCreator>) {
    let creator = Arc::new(RecordingSessionCreator::new());
    (MatchmakingEngine::new(creator.clone()), creator)
}

fn kind(err: &anyhow::Error) -> Option<&MatchmakingError> {
    MatchmakingError::from_anyhow(err)
}

#[tokio::test]
async fn test_two_participants_pair_and_share_status() {
    let (engine, _creator) = create_test_system();

    assert!(engine.enqueue("A", "model-a").await.unwrap().is_none());
    assert_eq!(
        engine.stats().await,
        QueueStats {
            queue_length: 1,
            active_pairings: 0
        }
    );

    let pairing = engine.enqueue("B", "model-b").await.unwrap().unwrap();
    assert_eq!(pairing.session_port, 9000);
    assert_eq!(
        engine.stats().await,
        QueueStats {
            queue_length: 0,
            active_pairings: 1
        }
    );

    let status_a = engine.status("A").await.unwrap();
    let status_b = engine.status("B").await.unwrap();
    assert_eq!(status_a.pairing.as_ref(), Some(&pairing));
    assert_eq!(status_b.pairing.as_ref(), Some(&pairing));
    assert_eq!(status_a.queue_position, -1);
}

#[tokio::test]
async fn test_complete_pairing_lifecycle() {
    let (engine, _creator) = create_test_system();
    let ratings = Arc::new(InMemoryRatingStorage::with_initial_rating(1200));
    let rating_service = RatingService::new(ratings.clone());

    engine.enqueue("alice", "alpha").await.unwrap();
    let pairing = engine.enqueue("bob", "beta").await.unwrap().unwrap();

    let pairing = engine
        .set_pairing_status(&pairing.pairing_id, PairingStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(pairing.status, PairingStatus::InProgress);

    // Session finished: alice's model won
    let outcome = MatchOutcome {
        winner_model_id: pairing.participant_a.model_id.clone(),
        loser_model_id: pairing.participant_b.model_id.clone(),
        is_draw: false,
    };
    let (winner, loser) = rating_service.record_outcome(&outcome).await.unwrap();
    assert_eq!(winner.change.new_rating, 1216);
    assert_eq!(loser.change.new_rating, 1184);
    assert_eq!(ratings.get_rating("alpha").unwrap(), Some(1216));

    engine
        .set_pairing_status(&pairing.pairing_id, PairingStatus::Completed)
        .await
        .unwrap();
    engine.remove_pairing(&pairing.pairing_id).await.unwrap();

    assert_eq!(engine.status("alice").await.unwrap(), ParticipantStatus::unknown());
    assert_eq!(engine.stats().await, QueueStats::default());

    // Both can queue again and meet a newcomer in FIFO order
    engine.enqueue("bob", "beta").await.unwrap();
    let next = engine.enqueue("carol", "gamma").await.unwrap().unwrap();
    assert_eq!(next.participant_a.participant_id, "bob");
    assert_eq!(next.participant_b.participant_id, "carol");
    engine.verify_invariants().await.unwrap();
}

#[tokio::test]
async fn test_http_session_creator_end_to_end() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/game/create");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "gameId": "engine-game-1",
                "wsPort": 9555
            }));
        })
        .await;

    let creator = HttpSessionCreator::new(HttpSessionCreatorConfig {
        engine_url: server.base_url(),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap();
    let engine = MatchmakingEngine::new(Arc::new(creator));

    engine.enqueue("alice", "alpha").await.unwrap();
    let pairing = engine.enqueue("bob", "beta").await.unwrap().unwrap();

    create.assert_async().await;
    assert_eq!(pairing.session_id, "engine-game-1");
    assert_eq!(pairing.session_port, 9555);
}

#[tokio::test]
async fn test_http_engine_failure_rolls_back() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/game/create");
            then.status(503).json_body(serde_json::json!({
                "success": false,
                "error": "no free workers"
            }));
        })
        .await;

    let creator = HttpSessionCreator::new(HttpSessionCreatorConfig {
        engine_url: server.base_url(),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap();
    let engine = MatchmakingEngine::new(Arc::new(creator));

    engine.enqueue("alice", "alpha").await.unwrap();
    let err = engine.enqueue("bob", "beta").await.unwrap_err();

    match kind(&err) {
        Some(MatchmakingError::SessionCreationFailed { reason }) => {
            assert!(reason.contains("no free workers"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(engine.status("alice").await.unwrap().queue_position, 0);
    assert_eq!(engine.status("bob").await.unwrap().queue_position, 1);
    assert_eq!(engine.stats().await.active_pairings, 0);
}

#[tokio::test]
async fn test_unreachable_engine_rolls_back() {
    // Nothing listens on port 9 (discard) in the test environment
    let creator = HttpSessionCreator::new(HttpSessionCreatorConfig {
        engine_url: "http://127.0.0.1:9".to_string(),
        request_timeout: Duration::from_millis(500),
    })
    .unwrap();
    let engine = MatchmakingEngine::new(Arc::new(creator));

    engine.enqueue("alice", "alpha").await.unwrap();
    assert!(engine.enqueue("bob", "beta").await.is_err());

    assert_eq!(engine.stats().await.queue_length, 2);
    engine.verify_invariants().await.unwrap();
}

#[tokio::test]
async fn test_flaky_engine_never_loses_participants() {
    let creator = Arc::new(FlakySessionCreator::new(3));
    let engine = MatchmakingEngine::new(creator.clone());
    let ids = fixtures::participant_ids("p", 20);

    for id in &ids {
        let _ = engine.enqueue(id, "model").await;
        engine.verify_invariants().await.unwrap();
    }

    let stats = engine.stats().await;
    assert_eq!(stats.queue_length + 2 * stats.active_pairings, ids.len());
    assert!(creator.failures() > 0);
    assert_eq!(
        engine.totals().await.session_failures as usize,
        creator.failures()
    );
}

#[tokio::test]
async fn test_withdraw_then_pair_skips_withdrawn() {
    let (engine, _creator) = create_test_system();

    engine.enqueue("a", "m").await.unwrap();
    engine.withdraw("a").await.unwrap();
    engine.enqueue("b", "m").await.unwrap();
    let pairing = engine.enqueue("c", "m").await.unwrap().unwrap();

    assert_eq!(pairing.participant_a.participant_id, "b");
    assert_eq!(pairing.participant_b.participant_id, "c");
    assert!(matches!(
        kind(&engine.withdraw("a").await.unwrap_err()),
        Some(MatchmakingError::NotQueued { .. })
    ));
}

#[derive(Debug, Clone)]
enum Op {
    Enqueue(usize),
    Withdraw(usize),
    Cleanup(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..12).prop_map(Op::Enqueue),
        1 => (0usize..12).prop_map(Op::Withdraw),
        1 => (0usize..12).prop_map(Op::Cleanup),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sequential_enqueues_pair_in_arrival_order(count in 0usize..40) {
        tokio_test::block_on(async {
            let (engine, _creator) = create_test_system();
            let ids = fixtures::participant_ids("p", count);
            let mut pairs = Vec::new();

            for id in &ids {
                if let Some(pairing) = engine.enqueue(id, "m").await.unwrap() {
                    pairs.push((
                        pairing.participant_a.participant_id,
                        pairing.participant_b.participant_id,
                    ));
                }
            }

            let expected: Vec<(String, String)> = ids
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            assert_eq!(pairs, expected);
            assert_eq!(engine.stats().await.queue_length, count % 2);
        });
    }

    #[test]
    fn prop_queued_and_paired_stay_disjoint(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        tokio_test::block_on(async {
            let creator = Arc::new(FlakySessionCreator::new(4));
            let engine = MatchmakingEngine::new(creator);

            for op in &ops {
                match op {
                    Op::Enqueue(i) => {
                        let _ = engine.enqueue(&format!("p{}", i), "m").await;
                    }
                    Op::Withdraw(i) => {
                        let _ = engine.withdraw(&format!("p{}", i)).await;
                    }
                    Op::Cleanup(i) => {
                        let _ = engine.remove_participant_pairing(&format!("p{}", i)).await;
                    }
                }

                engine.verify_invariants().await.unwrap();

                let queued: HashSet<String> = engine
                    .queued_participants()
                    .await
                    .into_iter()
                    .map(|p| p.participant_id)
                    .collect();
                for pairing in engine.get_all_pairings().await {
                    for id in pairing.participant_ids() {
                        assert!(!queued.contains(id), "{} both queued and paired", id);
                    }
                }
            }
        });
    }
}
