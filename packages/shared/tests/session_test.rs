pub mod common;

use std::time::Duration;

use common::*;
use rust_decimal_macros::dec;
use shared::models::events::{GameEndReason, ServerEvent};
use shared::models::game_record::GameRecordStatus;
use shared::models::room::{Color, PlayerMove, RoomStatus};
use shared::repositories::game_record_repository::GameRecordRepository;
use shared::repositories::room_repository::RoomRepository;
use shared::services::errors::game_session_service_errors::GameSessionServiceError;
use shared::services::game_session_service::DisconnectOutcome;
use shared::services::matchmaking_service::DepartureOutcome;

fn mv(from: &str, to: &str) -> PlayerMove {
    PlayerMove {
        from: from.to_string(),
        to: to.to_string(),
        promotion: None,
    }
}

async fn two_player_platform() -> Platform {
    let platform = Platform::new(dec!(0.28));
    platform.open_account("a", dec!(100)).await;
    platform.open_account("b", dec!(100)).await;
    platform
}

/// B disconnects and never comes back: A wins by abandonment after the grace period.
#[tokio::test(start_paused = true)]
async fn test_absent_player_forfeits_after_grace() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;

    platform
        .coordinator
        .handle_disconnect(&connection("b"))
        .await
        .unwrap();
    tokio::time::sleep(GRACE - Duration::from_secs(1)).await;
    assert!(platform.store.get_room(&room.id).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(platform.store.get_room(&room.id).await.unwrap().is_none());
    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::Abandoned);
    assert_eq!(record.winner_id.as_deref(), Some("a"));
    assert_eq!(record.loser_id.as_deref(), Some("b"));
    assert_eq!(platform.account("a").await.account_balance, dec!(110));
    assert_eq!(platform.account("b").await.account_balance, dec!(90));
    assert!(platform
        .notifier
        .sent_to(&connection("a"))
        .await
        .iter()
        .any(|e| matches!(
            e,
            ServerEvent::GameEnded {
                reason: GameEndReason::Abandonment,
                ..
            }
        )));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_keeps_match_alive() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;
    platform
        .coordinator
        .handle_disconnect(&connection("b"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let resumed = platform
        .sessions()
        .join_room("conn-b-2", &room.id, "b")
        .await
        .unwrap();
    let again = platform
        .sessions()
        .join_room("conn-b-3", &room.id, "b")
        .await;
    tokio::time::sleep(GRACE * 2).await;

    assert_eq!(resumed.status, RoomStatus::Active);
    assert_eq!(
        again,
        Err(GameSessionServiceError::AlreadyConnected("b".to_string()))
    );
    let stored = platform.store.get_room(&room.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RoomStatus::Active);
    assert_eq!(stored.player_by_user("b").unwrap().connection_id, "conn-b-2");
    assert_eq!(platform.account("b").await.blocked_amount, dec!(10));
    assert!(platform
        .notifier
        .sent_to("conn-b-2")
        .await
        .iter()
        .any(|e| matches!(e, ServerEvent::GameResume { .. })));
}

#[tokio::test]
async fn test_only_the_player_to_move_may_move() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;
    let white = room.player_with_color(Color::White).unwrap().connection_id.clone();
    let black = room.player_with_color(Color::Black).unwrap().connection_id.clone();

    let early = platform
        .sessions()
        .make_move(&black, &room.id, mv("e7", "e5"), None)
        .await;
    assert!(matches!(early, Err(GameSessionServiceError::InvalidMove(_))));

    let sequence = [(&white, mv("e2", "e4")), (&black, mv("e7", "e5")), (&white, mv("g1", "f3"))];
    for (conn, player_move) in sequence {
        platform
            .sessions()
            .make_move(conn, &room.id, player_move, None)
            .await
            .unwrap();
    }
    let double = platform
        .sessions()
        .make_move(&white, &room.id, mv("f1", "c4"), None)
        .await;
    assert!(matches!(double, Err(GameSessionServiceError::InvalidMove(_))));

    let stored = platform.store.get_room(&room.id).await.unwrap().unwrap();
    assert_eq!(stored.moves_white, vec![mv("e2", "e4"), mv("g1", "f3")]);
    assert_eq!(stored.moves_black, vec![mv("e7", "e5")]);
    assert_eq!(stored.current_turn.as_deref(), Some(black.as_str()));
}

/// The winner is decided once even when a reported result and a grace expiry race.
#[tokio::test(start_paused = true)]
async fn test_result_and_grace_expiry_settle_once() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;
    let outcome = platform
        .coordinator
        .handle_disconnect(&connection("b"))
        .await
        .unwrap();
    let DepartureOutcome::Disconnected(DisconnectOutcome::GraceStarted { epoch, .. }) = outcome else {
        panic!("expected a grace period, got {:?}", outcome);
    };

    let conn_a = connection("a");
    let (reported, forfeited) = tokio::join!(
        platform.sessions().end_game(
            &conn_a,
            &room.id,
            GameEndReason::Resignation,
            Some("a".to_string()),
            Some("b".to_string()),
        ),
        platform.sessions().forfeit_if_still_away(&room.id, "b", epoch),
    );
    tokio::time::sleep(GRACE * 2).await;

    let settled_by_report = matches!(reported, Ok(Some(_)));
    let settled_by_forfeit = forfeited == Ok(true);
    assert!(settled_by_report ^ settled_by_forfeit);
    assert_eq!(platform.account("a").await.account_balance, dec!(110));
    assert_eq!(platform.account("b").await.account_balance, dec!(90));
    assert_eq!(platform.account("a").await.blocked_amount, dec!(0));
}

#[tokio::test(start_paused = true)]
async fn test_both_players_gone_voids_match() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;

    platform
        .coordinator
        .handle_disconnect(&connection("a"))
        .await
        .unwrap();
    let outcome = platform
        .coordinator
        .handle_disconnect(&connection("b"))
        .await
        .unwrap();
    tokio::time::sleep(GRACE * 2).await;

    assert_eq!(
        outcome,
        DepartureOutcome::Disconnected(DisconnectOutcome::MatchVoided)
    );
    for user in ["a", "b"] {
        let account = platform.account(user).await;
        assert_eq!(account.account_balance, dec!(100));
        assert_eq!(account.blocked_amount, dec!(0));
    }
    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::Abandoned);
    assert!(record.winner_id.is_none());
}

#[tokio::test]
async fn test_checkmate_records_full_history() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;
    let white = room.player_with_color(Color::White).unwrap().clone();
    let black = room.player_with_color(Color::Black).unwrap().clone();
    platform
        .sessions()
        .make_move(&white.connection_id, &room.id, mv("f2", "f3"), None)
        .await
        .unwrap();
    platform
        .sessions()
        .make_move(&black.connection_id, &room.id, mv("e7", "e5"), None)
        .await
        .unwrap();

    platform
        .sessions()
        .end_game(
            &black.connection_id,
            &room.id,
            GameEndReason::Checkmate,
            Some(black.user_id.clone()),
            Some(white.user_id.clone()),
        )
        .await
        .unwrap();

    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::Completed);
    assert_eq!(record.result.as_deref(), Some("checkmate"));
    assert_eq!(record.winner_rating_delta, Some(16));
    assert_eq!(record.loser_rating_delta, Some(-16));
    assert_eq!(record.moves_white, vec![mv("f2", "f3")]);
    assert_eq!(record.moves_black, vec![mv("e7", "e5")]);
    assert!(platform
        .store
        .room_connection(&white.connection_id)
        .await
        .is_none());
}

/// The settlement store is down when the game ends: the stakes stay held on the ended
/// room until the winner's connection closes and the settlement is picked up again.
#[tokio::test(start_paused = true)]
async fn test_pending_settlement_completes_on_next_departure() {
    let platform = two_player_platform().await;
    let room = platform
        .start_match(find_match("a", 1500, dec!(10)), find_match("b", 1500, dec!(10)))
        .await;
    platform.store.set_settlement_unavailable(true);

    let ended = platform
        .sessions()
        .end_game(
            &connection("b"),
            &room.id,
            GameEndReason::Checkmate,
            Some("a".to_string()),
            Some("b".to_string()),
        )
        .await;
    assert!(matches!(ended, Err(GameSessionServiceError::EscrowError(_))));
    let pending = platform.store.get_room(&room.id).await.unwrap().unwrap();
    assert_eq!(pending.status, RoomStatus::Completed);
    assert_eq!(platform.account("a").await.blocked_amount, dec!(10));

    platform.store.set_settlement_unavailable(false);
    let departure = platform
        .coordinator
        .handle_disconnect(&connection("a"))
        .await
        .unwrap();

    assert_eq!(departure, DepartureOutcome::NotInRoom);
    assert!(platform.store.get_room(&room.id).await.unwrap().is_none());
    let a = platform.account("a").await;
    let b = platform.account("b").await;
    assert_eq!((a.account_balance, a.blocked_amount), (dec!(110), dec!(0)));
    assert_eq!((b.account_balance, b.blocked_amount), (dec!(90), dec!(0)));
    let record = platform.store.get_game(&room.id).await.unwrap().unwrap();
    assert_eq!(record.status, GameRecordStatus::Completed);
}
