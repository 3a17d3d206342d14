//! Inbound webhook payloads and their classification.
//!
//! Monzo sends every event type to the same URL. The envelope is decoded
//! first so that unrelated events are acknowledged without needing to match
//! the (large, evolving) transaction schema. Unknown fields are ignored.

use serde::{Deserialize, Deserializer};

use super::error::AppError;

/// Event type that carries a new transaction
pub const TRANSACTION_CREATED: &str = "transaction.created";

/// Minimal envelope used to discriminate payload shape
#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Full `transaction.created` payload
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionCreatedEvent {
    pub data: TransactionData,
}

/// Only the fields the notification reads are decoded. Optional strings
/// accept `null` as well as being absent.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    pub account_id: String,
    /// Signed amount in minor units; negative for debits
    pub amount: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Empty (or null) until the transaction settles
    #[serde(default)]
    pub settled: Option<String>,
    #[serde(default)]
    pub merchant: Option<Merchant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Merchant {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why an event was acknowledged without posting anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotTransactionCreated,
    IncomingFunds,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotTransactionCreated => write!(f, "not a transaction.created event"),
            Self::IncomingFunds => write!(f, "incoming transaction"),
        }
    }
}

/// The subset of a debit the notification needs
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub merchant_name: Option<String>,
    pub settled: bool,
}

impl OutgoingTransaction {
    /// Merchant name, or the raw statement description for merchant-less transactions.
    pub fn payee(&self) -> &str {
        self.merchant_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.description)
    }
}

impl From<TransactionData> for OutgoingTransaction {
    fn from(data: TransactionData) -> Self {
        Self {
            transaction_id: data.id,
            account_id: data.account_id,
            amount: data.amount,
            currency: data.currency,
            description: data.description,
            merchant_name: data.merchant.map(|m| m.name),
            settled: data.settled.is_some_and(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Skip(SkipReason),
    Outgoing(OutgoingTransaction),
}

/// Decode a raw webhook body and decide whether it needs a notification.
pub fn classify(body: &[u8]) -> Result<Classification, AppError> {
    let envelope: Event = serde_json::from_slice(body)
        .map_err(|e| AppError::MalformedPayload(format!("Couldn't decode event envelope: {}", e)))?;

    if envelope.event_type != TRANSACTION_CREATED {
        return Ok(Classification::Skip(SkipReason::NotTransactionCreated));
    }

    let event: TransactionCreatedEvent = serde_json::from_slice(body).map_err(|e| {
        AppError::MalformedPayload(format!("Couldn't decode {} event: {}", TRANSACTION_CREATED, e))
    })?;

    if event.data.amount >= 0 {
        return Ok(Classification::Skip(SkipReason::IncomingFunds));
    }

    Ok(Classification::Outgoing(event.data.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transaction(amount: i64) -> serde_json::Value {
        json!({
            "type": "transaction.created",
            "data": {
                "id": "tx_00009",
                "created": "2019-02-07T00:23:11.401Z",
                "description": "WWW.CODECLUB.ORG.UK    CAMBRIDGE     GBR",
                "amount": amount,
                "fees": {},
                "currency": "GBP",
                "merchant": {
                    "id": "merch_1",
                    "group_id": "grp_1",
                    "name": "www.codeclub.org.uk",
                    "category": "general",
                    "online": true,
                    "address": {"city": "CAMBRIDGE", "latitude": 52.19}
                },
                "metadata": {"mcc": "1234567890"},
                "labels": null,
                "settled": "",
                "local_amount": amount,
                "account_id": "acc_00009",
                "include_in_spending": true
            }
        })
    }

    fn bytes(value: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_outgoing_transaction_extracted() {
        let tx = match classify(&bytes(&transaction(-1000))).unwrap() {
            Classification::Outgoing(tx) => tx,
            other => panic!("expected outgoing transaction, got {:?}", other),
        };
        assert_eq!(tx.account_id, "acc_00009");
        assert_eq!(tx.amount, -1000);
        assert_eq!(tx.currency, "GBP");
        assert_eq!(tx.payee(), "www.codeclub.org.uk");
        assert!(!tx.settled);
    }

    #[test]
    fn test_other_event_types_skipped() {
        for event_type in ["account.created", "transaction.updated", ""] {
            let body = bytes(&json!({"type": event_type, "data": {"unrelated": true}}));
            assert_eq!(
                classify(&body).unwrap(),
                Classification::Skip(SkipReason::NotTransactionCreated)
            );
        }
    }

    #[test]
    fn test_incoming_and_zero_amounts_skipped() {
        for amount in [0, 1, 250_000] {
            assert_eq!(
                classify(&bytes(&transaction(amount))).unwrap(),
                Classification::Skip(SkipReason::IncomingFunds)
            );
        }
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let bodies: [&[u8]; 5] = [b"not json", b"", b"{\"data\": {}}", b"[1,2,3]", b"{\"type\": 7}"];
        for body in bodies {
            assert!(matches!(classify(body), Err(AppError::MalformedPayload(_))));
        }
    }

    #[test]
    fn test_transaction_with_wrong_shape_is_malformed() {
        let body = bytes(&json!({"type": "transaction.created", "data": {"amount": "ten"}}));
        let err = classify(&body).unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(msg) if msg.contains("transaction.created")));
    }

    #[test]
    fn test_missing_merchant_falls_back_to_description() {
        let mut value = transaction(-500);
        value["data"]["merchant"] = serde_json::Value::Null;
        value["data"]["description"] = json!("Transfer to savings");
        value["data"]["settled"] = json!("2019-02-08T00:00:00Z");

        let Classification::Outgoing(tx) = classify(&bytes(&value)).unwrap() else {
            panic!("expected outgoing transaction");
        };
        assert_eq!(tx.merchant_name, None);
        assert_eq!(tx.payee(), "Transfer to savings");
        assert!(tx.settled);
    }

    #[test]
    fn test_nulls_in_optional_fields_are_tolerated() {
        let mut value = transaction(-1000);
        for field in ["id", "category", "created", "currency", "labels", "settled"] {
            value["data"][field] = serde_json::Value::Null;
        }
        value["data"]["merchant"] = json!({"name": "Pret", "logo": null, "id": null, "category": null});

        let Classification::Outgoing(tx) = classify(&bytes(&value)).unwrap() else {
            panic!("expected outgoing transaction");
        };
        assert_eq!(tx.currency, "");
        assert_eq!(tx.payee(), "Pret");
        assert!(!tx.settled);

        value["data"]["description"] = serde_json::Value::Null;
        assert!(matches!(
            classify(&bytes(&value)).unwrap(),
            Classification::Outgoing(_)
        ));
    }

    #[test]
    fn test_nameless_merchant_uses_description() {
        let mut value = transaction(-1000);
        value["data"]["merchant"] = json!({"id": "merch_2"});
        value["data"]["description"] = json!("SAINSBURYS S/MKTS");

        let Classification::Outgoing(tx) = classify(&bytes(&value)).unwrap() else {
            panic!("expected outgoing transaction");
        };
        assert_eq!(tx.merchant_name.as_deref(), Some(""));
        assert_eq!(tx.payee(), "SAINSBURYS S/MKTS");
    }
}
