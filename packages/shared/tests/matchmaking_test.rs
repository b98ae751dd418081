pub mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::*;
use rust_decimal_macros::dec;
use shared::models::events::{GameEndReason, ServerEvent};
use shared::models::game_record::GameRecordStatus;
use shared::models::transaction::TransactionStatus;
use shared::repositories::game_record_repository::GameRecordRepository;
use shared::repositories::room_repository::RoomRepository;
use shared::services::errors::matchmaking_service_errors::MatchmakingServiceError;
use shared::services::matchmaking_service::MatchResult;

/// 1500 waits, 1510 arrives: inside the first tolerance window, so they are paired.
#[tokio::test]
async fn test_close_ratings_are_paired() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(500)).await;
    platform.open_account("b", dec!(500)).await;

    let first = platform
        .coordinator
        .request_match(find_match("a", 1500, dec!(100)))
        .await
        .unwrap();
    let MatchResult::Queued(waiting) = first else {
        panic!("a should wait, got {:?}", first);
    };
    let second = platform
        .coordinator
        .request_match(find_match("b", 1510, dec!(100)))
        .await
        .unwrap();
    let MatchResult::Matched(room) = second else {
        panic!("b should be paired, got {:?}", second);
    };

    assert_eq!(room.id, waiting.game_id);
    assert!(room.player_by_user("a").is_some());
    assert!(room.player_by_user("b").is_some());
    for user in ["a", "b"] {
        let account = platform.account(user).await;
        assert_eq!(account.blocked_amount, dec!(100));
        assert_eq!(account.available_amount, dec!(400));
    }
    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::InProgress);
    assert!(platform
        .notifier
        .sent_to(&connection("a"))
        .await
        .iter()
        .any(|e| matches!(e, ServerEvent::GameStart { .. })));
}

#[tokio::test]
async fn test_distant_ratings_wait_unless_extended() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(500)).await;
    platform.open_account("b", dec!(500)).await;
    platform.open_account("c", dec!(500)).await;

    platform
        .coordinator
        .request_match(find_match("a", 1000, dec!(10)))
        .await
        .unwrap();
    let far = platform
        .coordinator
        .request_match(find_match("b", 1900, dec!(10)))
        .await
        .unwrap();
    assert!(matches!(far, MatchResult::Queued(_)));

    let mut extended = find_match("c", 2400, dec!(10));
    extended.allow_extended_search = true;
    let result = platform.coordinator.request_match(extended).await.unwrap();
    assert!(matches!(result, MatchResult::Matched(_)));
}

/// Balance 1000 with 950 already blocked cannot cover a 100 stake.
#[tokio::test]
async fn test_block_beyond_available_is_refused() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(1000)).await;
    platform.escrow.block("a", dec!(950)).await.unwrap();

    let result = platform
        .coordinator
        .request_match(find_match("a", 1500, dec!(100)))
        .await;

    assert_eq!(
        result,
        Err(MatchmakingServiceError::InsufficientFunds("a".to_string()))
    );
    let account = platform.account("a").await;
    assert_eq!(account.account_balance, dec!(1000));
    assert_eq!(account.blocked_amount, dec!(950));
    assert_eq!(account.available_amount, dec!(50));
    assert_eq!(platform.store.room_count().await, 0);
    assert!(platform.store.queued_entries("rapid#100").await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_blocks_never_overcommit() {
    let platform = Arc::new(Platform::new(dec!(0.28)));
    platform.open_account("a", dec!(100)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let platform = platform.clone();
        handles.push(tokio::spawn(async move {
            platform.escrow.block("a", dec!(30)).await.is_ok()
        }));
    }
    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 3);
    let account = platform.account("a").await;
    assert_eq!(account.blocked_amount, dec!(90));
    assert!(account.blocked_amount <= account.account_balance);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_pair_each_player_once() {
    let platform = Arc::new(Platform::new(dec!(0.28)));
    let users: Vec<String> = (0..20).map(|i| format!("p{}", i)).collect();
    for user in &users {
        platform.open_account(user, dec!(100)).await;
    }

    let mut handles = Vec::new();
    for user in users.clone() {
        let platform = platform.clone();
        handles.push(tokio::spawn(async move {
            platform
                .coordinator
                .request_match(find_match(&user, 1500, dec!(10)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut rooms = HashSet::new();
    for user in &users {
        let index = platform
            .store
            .room_connection(&connection(user))
            .await
            .expect("every player ends up in a room");
        let room = platform
            .store
            .get_room(&index.room_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room.players.len(), 2, "{} was left in a lobby", user);
        assert!(room.player_by_user(user).is_some());
        rooms.insert(room.id);
        assert_eq!(platform.account(user).await.blocked_amount, dec!(10));
    }
    assert_eq!(rooms.len(), 10);
    assert_eq!(platform.store.room_count().await, 10);
    assert!(platform.store.queued_entries("rapid#10").await.is_empty());
}

#[tokio::test]
async fn test_gone_opponent_refunds_both_players() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(100)).await;
    platform.open_account("b", dec!(100)).await;
    platform
        .coordinator
        .request_match(find_match("a", 1500, dec!(20)))
        .await
        .unwrap();
    platform.notifier.mark_gone(&connection("a")).await;

    let result = platform
        .coordinator
        .request_match(find_match("b", 1500, dec!(20)))
        .await
        .unwrap();

    let MatchResult::OpponentUnavailable(room) = result else {
        panic!("expected the opponent to be unavailable, got {:?}", result);
    };
    assert_eq!(platform.store.room_count().await, 0);
    for user in ["a", "b"] {
        let account = platform.account(user).await;
        assert_eq!(account.blocked_amount, dec!(0));
        assert_eq!(account.account_balance, dec!(100));
        let transactions = platform.store.transactions_for(user).await;
        assert_eq!(transactions[0].transaction_status, TransactionStatus::Refunded);
    }
    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::Abandoned);
    assert!(platform
        .notifier
        .sent_to(&connection("b"))
        .await
        .iter()
        .any(|e| matches!(e, ServerEvent::MatchmakingUpdate { .. })));
}

#[tokio::test]
async fn test_queue_outage_leaves_no_trace() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(100)).await;
    platform.store.set_queue_unavailable(true);

    let result = platform
        .coordinator
        .request_match(find_match("a", 1500, dec!(20)))
        .await;

    assert!(matches!(result, Err(MatchmakingServiceError::QueueError(_))));
    assert_eq!(platform.account("a").await.blocked_amount, dec!(0));
    assert_eq!(platform.store.room_count().await, 0);

    platform.store.set_queue_unavailable(false);
    let retry = platform
        .coordinator
        .request_match(find_match("a", 1500, dec!(20)))
        .await
        .unwrap();
    assert!(matches!(retry, MatchResult::Queued(_)));
    assert_eq!(platform.account("a").await.blocked_amount, dec!(20));
}

/// A second tab searching while a match is live must block fresh funds, never the live stake.
#[tokio::test]
async fn test_second_tab_search_blocks_fresh_funds() {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(150)).await;
    platform.open_account("b", dec!(100)).await;
    platform.open_account("c", dec!(100)).await;
    let live = platform
        .start_match(find_match("a", 1500, dec!(100)), find_match("b", 1500, dec!(100)))
        .await;

    let mut second_tab = find_match("a", 1500, dec!(100));
    second_tab.connection_id = "conn-a-tab2".to_string();
    let refused = platform.coordinator.request_match(second_tab).await;
    assert_eq!(
        refused.err(),
        Some(MatchmakingServiceError::InsufficientFunds("a".to_string()))
    );

    let mut smaller = find_match("a", 1500, dec!(50));
    smaller.connection_id = "conn-a-tab2".to_string();
    let queued = platform.coordinator.request_match(smaller).await.unwrap();
    assert!(matches!(queued, MatchResult::Queued(_)));
    assert_eq!(platform.account("a").await.blocked_amount, dec!(150));
    let live_hold = platform
        .store
        .transactions_for("a")
        .await
        .into_iter()
        .find(|t| t.game_id.as_deref() == Some(live.id.as_str()))
        .unwrap();
    assert_eq!(live_hold.transaction_status, TransactionStatus::InProgress);

    let second = platform
        .coordinator
        .request_match(find_match("c", 1500, dec!(50)))
        .await
        .unwrap();
    let MatchResult::Matched(other) = second else {
        panic!("c should pair with a's second tab, got {:?}", second);
    };

    platform
        .sessions()
        .end_game(
            &connection("b"),
            &live.id,
            GameEndReason::Checkmate,
            Some("b".to_string()),
            Some("a".to_string()),
        )
        .await
        .unwrap();
    let a = platform.account("a").await;
    assert_eq!(a.account_balance, dec!(50));
    assert_eq!(a.blocked_amount, dec!(50));

    platform
        .sessions()
        .end_game(
            &connection("c"),
            &other.id,
            GameEndReason::Checkmate,
            Some("a".to_string()),
            Some("c".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(platform.account("a").await.blocked_amount, dec!(0));
    assert_eq!(platform.account("c").await.blocked_amount, dec!(0));
}
