//! Test Transaction Producer
//!
//! Generates PaySim-style transactions, sends them to the NATS scoring
//! subject as request/reply and logs the returned scores.

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Raw fields in the shape the scoring service expects
#[derive(Debug, Clone, Serialize)]
struct Features {
    step: i64,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_orig: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    features: Features,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    step: i64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            step: 1,
        }
    }

    /// Generate a random legitimate transaction
    fn generate_legitimate(&mut self) -> Features {
        self.advance();
        let kind = self.random_choice(&["PAYMENT", "CASH_IN", "DEBIT", "CASH_OUT", "TRANSFER"]);
        let old_balance_orig: f64 = self.rng.gen_range(1_000.0..200_000.0);
        let amount = self.rng.gen_range(10.0..old_balance_orig.min(50_000.0));
        let old_balance_dest: f64 = self.rng.gen_range(0.0..500_000.0);

        Features {
            step: self.step,
            amount,
            old_balance_orig,
            new_balance_orig: old_balance_orig - amount,
            old_balance_dest,
            new_balance_dest: old_balance_dest + amount,
            kind,
        }
    }

    /// Generate a transaction with the account-draining fraud pattern
    fn generate_suspicious(&mut self) -> Features {
        self.advance();
        let kind = self.random_choice(&["TRANSFER", "CASH_OUT"]);
        let balance: f64 = self.rng.gen_range(10_000.0..2_000_000.0);

        Features {
            step: self.step,
            amount: balance, // Empties the origin account
            old_balance_orig: balance,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0, // Destination balance never moves
            kind,
        }
    }

    fn advance(&mut self) {
        if self.rng.gen_bool(0.05) {
            self.step += 1;
        }
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Sending {} transactions for scoring...", count);

    let mut suspicious_sent = 0;
    let mut flagged = 0;
    let mut flagged_suspicious = 0;

    for i in 0..count {
        let suspicious = rng.gen_bool(fraud_rate);
        let features = if suspicious {
            suspicious_sent += 1;
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&PredictRequest { features })?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let score: Value = serde_json::from_slice(&reply.payload)?;
                if score["is_fraud"] == 1 {
                    flagged += 1;
                    if suspicious {
                        flagged_suspicious += 1;
                    }
                }
                if let Some(error) = score.get("error") {
                    warn!(error = %error, "Scoring service rejected transaction");
                }
            }
            Err(e) => warn!(error = %e, "Scoring request failed"),
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} transactions ({} suspicious, {} flagged)",
                i + 1,
                count,
                suspicious_sent,
                flagged
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} transactions: {} suspicious, {} flagged ({} of the suspicious)",
        count, suspicious_sent, flagged, flagged_suspicious
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let features = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&PredictRequest { features })?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
