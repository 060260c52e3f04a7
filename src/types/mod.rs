//! Type definitions for the fraud scoring service

pub mod score;
pub mod transaction;

pub use score::{HealthStatus, ScoreResult};
pub use transaction::{PredictRequest, RawTransaction, TransactionInput, TransactionType};
