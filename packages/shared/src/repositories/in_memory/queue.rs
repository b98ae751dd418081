use async_trait::async_trait;

use super::InMemoryStore;
use crate::matching::{assign_color, select_opponent};
use crate::models::queue::{MatchCriteria, MatchedPair, QueueEntry, QueueOutcome};
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;
use crate::repositories::queue_repository::MatchQueue;

#[async_trait]
impl MatchQueue for InMemoryStore {
    async fn submit_or_match(
        &self,
        entry: &QueueEntry,
        criteria: &MatchCriteria,
    ) -> Result<QueueOutcome, QueueRepositoryError> {
        if self.queue_is_unavailable() {
            return Err(QueueRepositoryError::DynamoDb(
                "match queue unavailable".to_string(),
            ));
        }

        let mut state = self.lock().await;
        let queue = state.queues.entry(entry.queue_key()).or_default();

        let opponent = select_opponent(entry, queue, criteria).map(|w| w.user_id().to_string());
        match opponent {
            Some(opponent_id) => {
                let position = queue
                    .iter()
                    .position(|queued| queued.user_id() == opponent_id);
                let waiting = match position {
                    Some(position) => queue.remove(position),
                    None => return Ok(QueueOutcome::Enqueued),
                };
                queue.retain(|queued| queued.user_id() != entry.user_id());
                let arriving_color = assign_color(&entry.candidate, &waiting.candidate);
                Ok(QueueOutcome::Matched(Box::new(MatchedPair {
                    waiting,
                    arriving: entry.clone(),
                    arriving_color,
                })))
            }
            None => {
                queue.retain(|queued| queued.user_id() != entry.user_id());
                queue.push(entry.clone());
                Ok(QueueOutcome::Enqueued)
            }
        }
    }

    async fn remove_entry(
        &self,
        queue_key: &str,
        user_id: &str,
    ) -> Result<bool, QueueRepositoryError> {
        if self.queue_is_unavailable() {
            return Err(QueueRepositoryError::DynamoDb(
                "match queue unavailable".to_string(),
            ));
        }
        let mut state = self.lock().await;
        let Some(queue) = state.queues.get_mut(queue_key) else {
            return Ok(false);
        };
        let before = queue.len();
        queue.retain(|queued| queued.user_id() != user_id);
        Ok(queue.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::PlayerCandidate;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn entry(user_id: &str, rating: i32, stake: Decimal) -> QueueEntry {
        QueueEntry {
            candidate: PlayerCandidate {
                user_id: user_id.to_string(),
                rating,
                games_played: 100,
                win_percentage: 0.5,
                last_ten_results: vec![],
                games_as_white: 10,
                games_as_black: 10,
                game_type: "rapid".to_string(),
            },
            connection_id: format!("conn-{}", user_id),
            username: user_id.to_string(),
            stake_amount: stake,
            lobby_room_id: format!("room-{}", user_id),
            stake_transaction_id: None,
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_second_arrival_is_matched_and_queue_emptied() {
        let store = InMemoryStore::new();
        let criteria = MatchCriteria::default();

        let mut b = entry("b", 1510, dec!(10));
        b.candidate.games_played = 105;
        b.candidate.win_percentage = 0.52;
        assert_eq!(
            store.submit_or_match(&b, &criteria).await.unwrap(),
            QueueOutcome::Enqueued
        );

        let a = entry("a", 1500, dec!(10));
        match store.submit_or_match(&a, &criteria).await.unwrap() {
            QueueOutcome::Matched(pair) => {
                assert_eq!(pair.waiting.user_id(), "b");
                assert_eq!(pair.arriving.user_id(), "a");
            }
            other => panic!("expected a match, got {:?}", other),
        }
        assert!(store.queued_entries(&a.queue_key()).await.is_empty());
    }

    #[tokio::test]
    async fn test_stake_tiers_do_not_mix() {
        let store = InMemoryStore::new();
        let criteria = MatchCriteria::default();

        store
            .submit_or_match(&entry("b", 1500, dec!(10)), &criteria)
            .await
            .unwrap();
        let outcome = store
            .submit_or_match(&entry("a", 1500, dec!(20)), &criteria)
            .await
            .unwrap();
        assert_eq!(outcome, QueueOutcome::Enqueued);
    }

    #[tokio::test]
    async fn test_resubmission_replaces_own_entry() {
        let store = InMemoryStore::new();
        let criteria = MatchCriteria::default();
        let a = entry("a", 1500, dec!(10));

        store.submit_or_match(&a, &criteria).await.unwrap();
        store.submit_or_match(&a, &criteria).await.unwrap();

        assert_eq!(store.queued_entries(&a.queue_key()).await.len(), 1);
        assert!(store.remove_entry(&a.queue_key(), "a").await.unwrap());
        assert!(!store.remove_entry(&a.queue_key(), "a").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiting_entry_is_paired_at_most_once() {
        let store = Arc::new(InMemoryStore::new());
        let criteria = MatchCriteria::default();
        store
            .submit_or_match(&entry("waiting", 1500, dec!(10)), &criteria)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let criteria = criteria.clone();
            handles.push(tokio::spawn(async move {
                let arriving = entry(&format!("arrival-{}", i), 1500, dec!(10));
                store.submit_or_match(&arriving, &criteria).await.unwrap()
            }));
        }

        let mut waiting_matches = 0;
        for handle in handles {
            if let QueueOutcome::Matched(pair) = handle.await.unwrap() {
                if pair.waiting.user_id() == "waiting" {
                    waiting_matches += 1;
                }
            }
        }
        assert_eq!(waiting_matches, 1);
    }
}
