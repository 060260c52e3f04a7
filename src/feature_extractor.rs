//! Feature engineering for fraud model inference.
//!
//! This module derives the engineered features used during Python model
//! training. The derivations must match training bit-for-bit, otherwise the
//! classifier silently scores garbage.

use crate::types::transaction::{RawTransaction, TransactionType};

/// Cutoff for `is_large_transaction` when the training 95th percentile is unavailable
pub const DEFAULT_AMOUNT_Q95: f64 = 100_000.0;

/// Lower bounds of `amount_category` buckets 1, 2 and 3
pub const AMOUNT_CATEGORY_BOUNDS: [f64; 3] = [1_000.0, 5_000.0, 20_000.0];

/// Names of every value in an [`EngineeredFeatureRow`], in training row order
pub const ENGINEERED_FEATURE_NAMES: [&str; 15] = [
    "step",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
    "type_encoded",
    "balance_change_orig",
    "balance_change_dest",
    "transaction_hour",
    "balance_zeroed",
    "amount_balance_ratio",
    "amount_category",
    "is_high_risk_type",
    "is_large_transaction",
];

/// Raw pass-through fields plus derived features for one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredFeatureRow {
    pub step: i64,
    pub amount: f64,
    pub old_balance_orig: f64,
    pub new_balance_orig: f64,
    pub old_balance_dest: f64,
    pub new_balance_dest: f64,
    pub type_encoded: u8,
    pub balance_change_orig: f64,
    pub balance_change_dest: f64,
    pub transaction_hour: i64,
    pub balance_zeroed: u8,
    pub amount_balance_ratio: f64,
    pub amount_category: u8,
    pub is_high_risk_type: u8,
    pub is_large_transaction: u8,
}

impl EngineeredFeatureRow {
    /// Look up a feature by its training column name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "step" => self.step as f64,
            "amount" => self.amount,
            "oldbalanceOrg" => self.old_balance_orig,
            "newbalanceOrig" => self.new_balance_orig,
            "oldbalanceDest" => self.old_balance_dest,
            "newbalanceDest" => self.new_balance_dest,
            "type_encoded" => f64::from(self.type_encoded),
            "balance_change_orig" => self.balance_change_orig,
            "balance_change_dest" => self.balance_change_dest,
            "transaction_hour" => self.transaction_hour as f64,
            "balance_zeroed" => f64::from(self.balance_zeroed),
            "amount_balance_ratio" => self.amount_balance_ratio,
            "amount_category" => f64::from(self.amount_category),
            "is_high_risk_type" => f64::from(self.is_high_risk_type),
            "is_large_transaction" => f64::from(self.is_large_transaction),
            _ => return None,
        };
        Some(value)
    }

    /// Iterate `(name, value)` pairs in training row order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        ENGINEERED_FEATURE_NAMES
            .into_iter()
            .filter_map(move |name| self.get(name).map(|v| (name, v)))
    }
}

/// Feature engineer that transforms validated transactions into model features.
///
/// Holds the large-transaction cutoff read once at startup.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    amount_q95: f64,
}

impl FeatureExtractor {
    /// Create a feature engineer with the training-time 95th percentile amount
    pub fn new(amount_q95: f64) -> Self {
        Self { amount_q95 }
    }

    /// Derive the engineered row for a transaction
    pub fn extract(&self, tx: &RawTransaction) -> EngineeredFeatureRow {
        let amount = tx.amount;
        let old_org = tx.old_balance_orig;
        let new_org = tx.new_balance_orig;

        EngineeredFeatureRow {
            step: tx.step,
            amount,
            old_balance_orig: old_org,
            new_balance_orig: new_org,
            old_balance_dest: tx.old_balance_dest,
            new_balance_dest: tx.new_balance_dest,
            type_encoded: tx.kind.code(),
            balance_change_orig: new_org - old_org,
            balance_change_dest: tx.new_balance_dest - tx.old_balance_dest,
            transaction_hour: tx.step.rem_euclid(24),
            balance_zeroed: u8::from(new_org == 0.0 && old_org != 0.0),
            // +1 keeps empty origin accounts finite
            amount_balance_ratio: amount / (old_org + 1.0),
            amount_category: amount_category(amount),
            is_high_risk_type: u8::from(tx.kind.is_high_risk()),
            is_large_transaction: u8::from(amount > self.amount_q95),
        }
    }

    /// Number of named values in an engineered row
    pub fn feature_count(&self) -> usize {
        ENGINEERED_FEATURE_NAMES.len()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_AMOUNT_Q95)
    }
}

/// Ordinal amount bucket; each bound belongs to the bucket above it
pub fn amount_category(amount: f64) -> u8 {
    AMOUNT_CATEGORY_BOUNDS
        .iter()
        .take_while(|&&bound| amount >= bound)
        .count() as u8
}

/// Convenience for callers that only hold a type label
pub fn type_encoded(label: &str) -> u8 {
    TransactionType::from_label(label).code()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_scenario() -> RawTransaction {
        RawTransaction {
            step: 1,
            amount: 9000.0,
            old_balance_orig: 10000.0,
            new_balance_orig: 1000.0,
            old_balance_dest: 0.0,
            new_balance_dest: 9000.0,
            kind: TransactionType::Transfer,
        }
    }

    #[test]
    fn test_transfer_scenario() {
        let row = FeatureExtractor::default().extract(&transfer_scenario());

        assert_eq!(row.amount_balance_ratio, 9000.0 / 10001.0);
        assert!((row.amount_balance_ratio - 0.8999).abs() < 1e-4);
        assert_eq!(row.balance_change_orig, -9000.0);
        assert_eq!(row.balance_change_dest, 9000.0);
        assert_eq!(row.amount_category, 2);
        assert_eq!(row.is_high_risk_type, 1);
        assert_eq!(row.type_encoded, 1);
        assert_eq!(row.transaction_hour, 1);
        assert_eq!(row.balance_zeroed, 0);
        assert_eq!(row.is_large_transaction, 0);
    }

    #[test]
    fn test_transaction_hour() {
        let extractor = FeatureExtractor::default();
        let mut tx = transfer_scenario();

        tx.step = 25;
        assert_eq!(extractor.extract(&tx).transaction_hour, 1);
        tx.step = 48;
        assert_eq!(extractor.extract(&tx).transaction_hour, 0);
        tx.step = -1;
        assert_eq!(extractor.extract(&tx).transaction_hour, 23);
    }

    #[test]
    fn test_amount_category_boundaries() {
        assert_eq!(amount_category(0.0), 0);
        assert_eq!(amount_category(999.99), 0);
        assert_eq!(amount_category(1000.0), 1);
        assert_eq!(amount_category(4999.99), 1);
        assert_eq!(amount_category(5000.0), 2);
        assert_eq!(amount_category(19999.99), 2);
        assert_eq!(amount_category(20000.0), 3);
        assert_eq!(amount_category(1e9), 3);
    }

    #[test]
    fn test_balance_zeroed() {
        let extractor = FeatureExtractor::default();
        let mut tx = RawTransaction::new(TransactionType::CashOut);

        tx.old_balance_orig = 500.0;
        tx.new_balance_orig = 0.0;
        assert_eq!(extractor.extract(&tx).balance_zeroed, 1);

        tx.old_balance_orig = 0.0;
        assert_eq!(extractor.extract(&tx).balance_zeroed, 0);

        tx.old_balance_orig = 500.0;
        tx.new_balance_orig = 10.0;
        assert_eq!(extractor.extract(&tx).balance_zeroed, 0);
    }

    #[test]
    fn test_type_encoding() {
        assert_eq!(type_encoded("TRANSFER"), 1);
        assert_eq!(type_encoded("CASH_OUT"), 2);
        assert_eq!(type_encoded("PAYMENT"), 3);
        assert_eq!(type_encoded("DEBIT"), 4);
        assert_eq!(type_encoded("UNKNOWN"), 0);
    }

    #[test]
    fn test_high_risk_types() {
        let extractor = FeatureExtractor::default();
        let risk = |kind| extractor.extract(&RawTransaction::new(kind)).is_high_risk_type;

        assert_eq!(risk(TransactionType::Transfer), 1);
        assert_eq!(risk(TransactionType::CashOut), 1);
        assert_eq!(risk(TransactionType::Payment), 0);
        assert_eq!(risk(TransactionType::Debit), 0);
        assert_eq!(risk(TransactionType::Unknown("CASH_IN".into())), 0);
    }

    #[test]
    fn test_large_transaction_cutoff() {
        let mut tx = transfer_scenario();
        tx.amount = 100_000.0;
        assert_eq!(FeatureExtractor::default().extract(&tx).is_large_transaction, 0);

        tx.amount = 100_000.01;
        assert_eq!(FeatureExtractor::default().extract(&tx).is_large_transaction, 1);

        tx.amount = 9000.0;
        assert_eq!(FeatureExtractor::new(5000.0).extract(&tx).is_large_transaction, 1);
    }

    #[test]
    fn test_negative_balance_ratio_not_special_cased() {
        let mut tx = transfer_scenario();
        tx.old_balance_orig = -3.0;
        assert_eq!(FeatureExtractor::default().extract(&tx).amount_balance_ratio, 9000.0 / -2.0);
    }

    #[test]
    fn test_ratio_unbounded_at_minus_one_balance() {
        let mut tx = transfer_scenario();
        tx.old_balance_orig = -1.0;
        tx.amount = 10.0;
        assert_eq!(FeatureExtractor::default().extract(&tx).amount_balance_ratio, f64::INFINITY);

        tx.amount = 0.0;
        assert!(FeatureExtractor::default().extract(&tx).amount_balance_ratio.is_nan());
    }

    #[test]
    fn test_row_lookup_covers_all_names() {
        let extractor = FeatureExtractor::default();
        let row = extractor.extract(&transfer_scenario());

        assert_eq!(row.iter().count(), extractor.feature_count());
        assert_eq!(row.get("amount"), Some(9000.0));
        assert_eq!(row.get("type_encoded"), Some(1.0));
        assert_eq!(row.get("isFlaggedFraud"), None);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let tx = transfer_scenario();
        assert_eq!(extractor.extract(&tx), extractor.extract(&tx));
    }
}
