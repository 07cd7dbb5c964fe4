//! User-deletion listener.
//!
//! Consumes `{"deleted": <user id>}` messages from one AMQP queue and purges the
//! user's habits and trackers. Messages are handled one at a time (prefetch 1).
//! Whether a message is acknowledged before or after the purge is decided by
//! [`AckMode`].

use std::time::Duration;

use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
        BasicRejectOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Connection, ConnectionProperties,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{AckMode, BrokerConfig};
use crate::database::{DatabaseError, HabitRepository, PurgeSummary};

const CONSUMER_TAG: &str = "habit-tracker-deletions";

/// Pause before handing a failed message back to the broker
const REDELIVERY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Malformed deletion event: {0}")]
    Malformed(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),
}

/// A user was deleted upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionEvent {
    pub user_id: i64,
}

impl DeletionEvent {
    /// Parse a message body. The id may arrive as a number or a numeric string.
    pub fn parse(body: &[u8]) -> Result<Self, ListenerError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ListenerError::Malformed(format!("invalid JSON: {}", e)))?;

        let deleted = value
            .get("deleted")
            .ok_or_else(|| ListenerError::Malformed("missing 'deleted' field".to_string()))?;

        let user_id = match deleted {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| ListenerError::Malformed(format!("'deleted' is not a user id: {}", deleted)))?;

        Ok(Self { user_id })
    }
}

/// What to tell the broker about a processed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Nack and requeue for another attempt
    Requeue,
    /// Drop without requeue; the message can never succeed
    Reject,
    /// Broker already considers the message consumed
    AutoAcked,
}

pub fn disposition(mode: AckMode, result: &Result<PurgeSummary, ListenerError>) -> Disposition {
    match (mode, result) {
        (AckMode::OnReceipt, _) => Disposition::AutoAcked,
        (AckMode::AfterProcessing, Ok(_)) => Disposition::Ack,
        (AckMode::AfterProcessing, Err(ListenerError::Malformed(_))) => Disposition::Reject,
        (AckMode::AfterProcessing, Err(_)) => Disposition::Requeue,
    }
}

/// Parse one message body and purge the named user's habits
pub async fn handle_message(repo: &HabitRepository, body: &[u8]) -> Result<PurgeSummary, ListenerError> {
    info!("Received message: {}", String::from_utf8_lossy(body));

    let event = DeletionEvent::parse(body)?;
    let summary = repo.purge_user(event.user_id).await?;

    info!(
        "Habits | user_id: {}, status: deleted ({} habits, {} trackers)",
        event.user_id, summary.habits, summary.trackers
    );
    Ok(summary)
}

/// Consume the deletion queue until the broker connection ends
pub async fn run(config: &BrokerConfig, repo: HabitRepository) -> Result<(), ListenerError> {
    let connection = Connection::connect(&config.amqp_uri(), ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;

    channel.basic_qos(1, BasicQosOptions::default()).await?;
    channel
        .queue_declare(&config.queue, QueueDeclareOptions::default(), FieldTable::default())
        .await?;

    let options = BasicConsumeOptions {
        no_ack: config.ack_mode == AckMode::OnReceipt,
        ..BasicConsumeOptions::default()
    };
    let mut consumer = channel
        .basic_consume(&config.queue, CONSUMER_TAG, options, FieldTable::default())
        .await?;

    info!("Waiting for messages on '{}' ({:?})", config.queue, config.ack_mode);

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;
        let result = handle_message(&repo, &delivery.data).await;

        if let Err(e) = &result {
            error!("Failed to process deletion event: {}", e);
        }

        match disposition(config.ack_mode, &result) {
            Disposition::Ack => {
                delivery.acker.ack(BasicAckOptions::default()).await?;
            }
            Disposition::Requeue => {
                tokio::time::sleep(REDELIVERY_BACKOFF).await;
                delivery
                    .acker
                    .nack(BasicNackOptions { requeue: true, ..BasicNackOptions::default() })
                    .await?;
            }
            Disposition::Reject => {
                warn!("Dropping unprocessable deletion event");
                delivery.acker.reject(BasicRejectOptions { requeue: false }).await?;
            }
            Disposition::AutoAcked => {}
        }
    }

    warn!("Deletion consumer stream ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory_pool, NewHabit};

    #[test]
    fn parses_numeric_and_string_ids() {
        assert_eq!(DeletionEvent::parse(br#"{"deleted": 42}"#).unwrap().user_id, 42);
        assert_eq!(DeletionEvent::parse(br#"{"deleted": "42"}"#).unwrap().user_id, 42);
    }

    #[test]
    fn rejects_malformed_payloads() {
        let bodies: [&[u8]; 4] = [b"not json", br#"{"user": 1}"#, br#"{"deleted": null}"#, br#"{"deleted": "x"}"#];
        for body in bodies {
            assert!(matches!(DeletionEvent::parse(body), Err(ListenerError::Malformed(_))));
        }
    }

    #[test]
    fn disposition_follows_ack_mode() {
        let ok: Result<PurgeSummary, ListenerError> = Ok(PurgeSummary::default());
        let malformed = Err(ListenerError::Malformed("bad".into()));
        let db = Err(ListenerError::Database(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)));

        assert_eq!(disposition(AckMode::AfterProcessing, &ok), Disposition::Ack);
        assert_eq!(disposition(AckMode::AfterProcessing, &malformed), Disposition::Reject);
        assert_eq!(disposition(AckMode::AfterProcessing, &db), Disposition::Requeue);

        for result in [&ok, &malformed, &db] {
            assert_eq!(disposition(AckMode::OnReceipt, result), Disposition::AutoAcked);
        }
    }

    #[tokio::test]
    async fn handle_message_purges_only_named_user() {
        let repo = HabitRepository::new(memory_pool().await.unwrap());
        for (user, title) in [(42, "Running"), (42, "Reading"), (7, "Chess")] {
            let habit = NewHabit { title: title.to_string(), description: None };
            repo.create_with_tracker(user, habit, "15-10-2026").await.unwrap();
        }

        let summary = handle_message(&repo, br#"{"deleted": 42}"#).await.unwrap();
        assert_eq!(summary, PurgeSummary { habits: 2, trackers: 2 });

        assert!(repo.list_owned(42).await.unwrap().is_empty());
        assert_eq!(repo.list_owned(7).await.unwrap().len(), 1);
    }
}
