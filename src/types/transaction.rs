//! Transaction data structures for PaySim-style mobile money transactions

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Step assigned when a request omits `step`
pub const DEFAULT_STEP: i64 = 1;

/// Type assigned when a request omits `type`.
///
/// An omitted type is scored as a transfer, one of the two high-risk types.
pub const DEFAULT_TRANSACTION_TYPE: TransactionType = TransactionType::Transfer;

/// Transaction type as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    Transfer,
    CashOut,
    Payment,
    Debit,
    /// Any other label (e.g. `CASH_IN`, lowercase variants), encoded as 0
    Unknown(String),
}

impl TransactionType {
    /// Parse a type label. Matching is exact and case-sensitive.
    pub fn from_label(label: &str) -> Self {
        match label {
            "TRANSFER" => TransactionType::Transfer,
            "CASH_OUT" => TransactionType::CashOut,
            "PAYMENT" => TransactionType::Payment,
            "DEBIT" => TransactionType::Debit,
            other => TransactionType::Unknown(other.to_string()),
        }
    }

    /// Ordinal encoding used at training time
    pub fn code(&self) -> u8 {
        match self {
            TransactionType::Transfer => 1,
            TransactionType::CashOut => 2,
            TransactionType::Payment => 3,
            TransactionType::Debit => 4,
            TransactionType::Unknown(_) => 0,
        }
    }

    /// TRANSFER and CASH_OUT carry the fraud in the training data
    pub fn is_high_risk(&self) -> bool {
        matches!(self, TransactionType::Transfer | TransactionType::CashOut)
    }

    pub fn label(&self) -> &str {
        match self {
            TransactionType::Transfer => "TRANSFER",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Unknown(label) => label,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inbound scoring request: `{"features": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Loosely typed raw fields, validated by [`TransactionInput::from_features`]
    pub features: Map<String, Value>,
}

/// A validated raw transaction
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    /// Simulation time step (1 step = 1 hour)
    pub step: i64,

    /// Transaction amount
    pub amount: f64,

    /// Origin balance before the transaction
    pub old_balance_orig: f64,

    /// Origin balance after the transaction
    pub new_balance_orig: f64,

    /// Destination balance before the transaction
    pub old_balance_dest: f64,

    /// Destination balance after the transaction
    pub new_balance_dest: f64,

    /// Transaction type
    pub kind: TransactionType,
}

impl RawTransaction {
    /// Create a transaction of the given type with every numeric field at its default
    pub fn new(kind: TransactionType) -> Self {
        Self {
            step: DEFAULT_STEP,
            amount: 0.0,
            old_balance_orig: 0.0,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
            kind,
        }
    }
}

/// Result of validating a request's feature map.
///
/// `defaulted` lists the recognized fields that were absent and filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    pub transaction: RawTransaction,
    pub defaulted: Vec<&'static str>,
}

impl TransactionInput {
    /// Convert an untyped feature map into a typed transaction.
    ///
    /// Unrecognized keys are ignored. Absent numeric fields default to zero,
    /// absent `step` to [`DEFAULT_STEP`], absent `type` to
    /// [`DEFAULT_TRANSACTION_TYPE`].
    pub fn from_features(features: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut defaulted = Vec::new();

        let mut real = |field: &'static str| -> Result<f64, ValidationError> {
            match features.get(field) {
                Some(value) => parse_real(field, value),
                None => {
                    defaulted.push(field);
                    Ok(0.0)
                }
            }
        };

        let amount = real("amount")?;
        let old_balance_orig = real("oldbalanceOrg")?;
        let new_balance_orig = real("newbalanceOrig")?;
        let old_balance_dest = real("oldbalanceDest")?;
        let new_balance_dest = real("newbalanceDest")?;

        let step = match features.get("step") {
            Some(value) => parse_step(value)?,
            None => {
                defaulted.push("step");
                DEFAULT_STEP
            }
        };

        let kind = match features.get("type") {
            Some(Value::String(label)) => TransactionType::from_label(label),
            Some(other) => {
                return Err(ValidationError::InvalidType {
                    found: json_kind(other),
                })
            }
            None => {
                defaulted.push("type");
                DEFAULT_TRANSACTION_TYPE
            }
        };

        Ok(Self {
            transaction: RawTransaction {
                step,
                amount,
                old_balance_orig,
                new_balance_orig,
                old_balance_dest,
                new_balance_dest,
                kind,
            },
            defaulted,
        })
    }
}

fn parse_real(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(ValidationError::NotFinite { field }),
        None => Err(ValidationError::NotNumeric {
            field,
            found: json_kind(value),
        }),
    }
}

fn parse_step(value: &Value) -> Result<i64, ValidationError> {
    const FIELD: &str = "step";

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            // Fractional steps truncate toward zero
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(ValidationError::NotInteger { field: FIELD }),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::NotInteger { field: FIELD }),
        other => Err(ValidationError::NotNumeric {
            field: FIELD,
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_full_payload() {
        let input = TransactionInput::from_features(&features(json!({
            "step": 1,
            "amount": 9000.0,
            "oldbalanceOrg": 10000.0,
            "newbalanceOrig": 1000.0,
            "oldbalanceDest": 0.0,
            "newbalanceDest": 9000.0,
            "type": "TRANSFER"
        })))
        .unwrap();

        assert!(input.defaulted.is_empty());
        assert_eq!(input.transaction.step, 1);
        assert_eq!(input.transaction.amount, 9000.0);
        assert_eq!(input.transaction.new_balance_dest, 9000.0);
        assert_eq!(input.transaction.kind, TransactionType::Transfer);
    }

    #[test]
    fn test_missing_fields_default() {
        let input = TransactionInput::from_features(&features(json!({ "amount": 10 }))).unwrap();

        assert_eq!(input.transaction.step, DEFAULT_STEP);
        assert_eq!(input.transaction.old_balance_orig, 0.0);
        assert_eq!(input.transaction.kind, TransactionType::Transfer);
        assert!(input.defaulted.contains(&"type"));
        assert!(input.defaulted.contains(&"step"));
        assert!(!input.defaulted.contains(&"amount"));
    }

    #[test]
    fn test_unrecognized_keys_ignored() {
        let input =
            TransactionInput::from_features(&features(json!({ "nameOrig": "C123", "isFlaggedFraud": 1 })))
                .unwrap();
        assert_eq!(input.transaction, RawTransaction::new(TransactionType::Transfer));
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let input = TransactionInput::from_features(&features(json!({
            "amount": " 250.5 ",
            "step": "30"
        })))
        .unwrap();
        assert_eq!(input.transaction.amount, 250.5);
        assert_eq!(input.transaction.step, 30);
    }

    #[test]
    fn test_fractional_step_truncates() {
        let input = TransactionInput::from_features(&features(json!({ "step": 25.9 }))).unwrap();
        assert_eq!(input.transaction.step, 25);
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = TransactionInput::from_features(&features(json!({ "amount": "lots" }))).unwrap_err();
        assert!(matches!(err, ValidationError::NotNumeric { field: "amount", .. }));

        let err = TransactionInput::from_features(&features(json!({ "oldbalanceOrg": true }))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NotNumeric {
                field: "oldbalanceOrg",
                found: "boolean"
            }
        ));

        let err = TransactionInput::from_features(&features(json!({ "amount": null }))).unwrap_err();
        assert!(matches!(err, ValidationError::NotNumeric { found: "null", .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = TransactionInput::from_features(&features(json!({ "amount": "NaN" }))).unwrap_err();
        assert!(matches!(err, ValidationError::NotFinite { field: "amount" }));
    }

    #[test]
    fn test_bad_step_rejected() {
        let err = TransactionInput::from_features(&features(json!({ "step": "1.5" }))).unwrap_err();
        assert!(matches!(err, ValidationError::NotInteger { field: "step" }));
    }

    #[test]
    fn test_non_string_type_rejected() {
        let err = TransactionInput::from_features(&features(json!({ "type": 1 }))).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidType { found: "number" }));
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(TransactionType::from_label("CASH_OUT").code(), 2);
        assert_eq!(TransactionType::from_label("DEBIT").code(), 4);
        assert_eq!(TransactionType::from_label("transfer").code(), 0);
        assert_eq!(TransactionType::from_label("CASH_IN").label(), "CASH_IN");
        assert!(!TransactionType::from_label("PAYMENT").is_high_risk());
    }

    #[test]
    fn test_request_deserialization() {
        let request: PredictRequest =
            serde_json::from_str(r#"{"features": {"amount": 1.0, "type": "DEBIT"}}"#).unwrap();
        assert_eq!(request.features.len(), 2);

        assert!(serde_json::from_str::<PredictRequest>(r#"{"amount": 1.0}"#).is_err());
    }
}
