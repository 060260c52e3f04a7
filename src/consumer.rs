//! NATS consumer scoring incoming transaction requests

use crate::producer::{ScorePublisher, ScoreReply};
use crate::service::PredictionService;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Consumer for scoring requests arriving over NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Score messages until the subscription closes, at most `workers` at a time
    pub async fn run(
        self,
        service: Arc<PredictionService>,
        publisher: ScorePublisher,
        workers: usize,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut subscription = self.subscribe().await?;

        while let Some(message) = subscription.next().await {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("worker semaphore closed")?;

            let service = service.clone();
            let publisher = publisher.clone();

            tokio::spawn(async move {
                let request_id = uuid::Uuid::new_v4();
                let outcome = service.predict_json(&message.payload);

                match &outcome {
                    Ok(result) => info!(
                        %request_id,
                        fraud_probability = result.fraud_probability,
                        is_fraud = result.is_fraud,
                        "Scored NATS transaction"
                    ),
                    Err(e) if e.is_client_error() => {
                        warn!(%request_id, error = %e, "Rejected NATS transaction")
                    }
                    Err(e) => error!(%request_id, error = %e, "Scoring failed"),
                }

                let reply = ScoreReply::from_outcome(&outcome);
                if let Err(e) = publisher.publish(message.reply.clone(), &reply).await {
                    error!(%request_id, error = %e, "Failed to publish score reply");
                }

                drop(permit);
            });
        }

        info!(subject = %self.subject, "Transaction subscription closed");
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
