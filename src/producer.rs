//! NATS publisher for scoring replies

use crate::error::PredictionError;
use crate::types::score::ScoreResult;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Body published back for one scoring request
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScoreReply {
    Score(ScoreResult),
    Error { error: String },
}

impl ScoreReply {
    pub fn from_outcome(outcome: &Result<ScoreResult, PredictionError>) -> Self {
        match outcome {
            Ok(result) => ScoreReply::Score(*result),
            Err(err) if err.is_client_error() => ScoreReply::Error { error: err.to_string() },
            Err(_) => ScoreReply::Error {
                error: "Scoring failed".to_string(),
            },
        }
    }
}

/// Publisher for scoring replies
#[derive(Clone)]
pub struct ScorePublisher {
    client: Client,
    subject: String,
}

impl ScorePublisher {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a reply to `reply_to`, or to the score subject when the request had none
    pub async fn publish(&self, reply_to: Option<Subject>, reply: &ScoreReply) -> Result<()> {
        let payload = serde_json::to_vec(reply)?;
        let subject = reply_to.unwrap_or_else(|| Subject::from(self.subject.as_str()));

        debug!(subject = %subject, "Publishing score reply");
        self.client.publish(subject, payload.into()).await?;

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ScoringError, ValidationError};

    #[test]
    fn test_score_reply_shape() {
        let reply = ScoreReply::from_outcome(&Ok(ScoreResult::from_probability(0.4, 0.23)));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["is_fraud"], 1);
        assert_eq!(json["engineered_features_used"], true);
    }

    #[test]
    fn test_error_reply_shapes() {
        let client_err = Err(ValidationError::NotInteger { field: "step" }.into());
        let json = serde_json::to_value(ScoreReply::from_outcome(&client_err)).unwrap();
        assert_eq!(json["error"], "field `step` must be an integer");

        let server_err = Err(ScoringError::Inference("onnx exploded".into()).into());
        let json = serde_json::to_value(ScoreReply::from_outcome(&server_err)).unwrap();
        assert_eq!(json["error"], "Scoring failed");
    }
}
