//! Transaction models

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use super::Address;

pub const NATIVE_TOKEN: &str = "ETH";
const UNKNOWN: &str = "unknown";

/// One row of the result table as returned by the analytics service.
///
/// Every field is optional on the wire; [`Transaction::try_from`] decides
/// which rows are usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub value_eth: Option<f64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub block_time: Option<String>,
}

/// Ordered result set of a transaction query
pub type Table = Vec<TransactionRow>;

/// Reasons a row cannot become a [`Transaction`]
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Empty address in field: {0}")]
    EmptyAddress(&'static str),
    #[error("Invalid value: {0}")]
    InvalidValue(f64),
}

/// Block time of a transaction, kept verbatim when the source format is unknown
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Parsed(DateTime<Utc>),
    Raw(String),
}

impl Timestamp {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Timestamp::Parsed(dt.with_timezone(&Utc));
        }

        // Dune renders timestamps as "2024-01-31 12:00:00.000 UTC"
        let without_zone = trimmed.trim_end_matches(" UTC");
        if let Ok(naive) = NaiveDateTime::parse_from_str(without_zone, "%Y-%m-%d %H:%M:%S%.f") {
            return Timestamp::Parsed(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }

        Timestamp::Raw(raw.to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Parsed(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            Timestamp::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A validated transfer between two addresses
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub tx_hash: String,
    pub sender: Address,
    pub receiver: Address,
    pub value: f64,
    pub timestamp: Timestamp,
    pub token_symbol: String,
}

impl TryFrom<&TransactionRow> for Transaction {
    type Error = RowError;

    fn try_from(row: &TransactionRow) -> Result<Self, Self::Error> {
        let sender = Address::new(row.from.as_deref().unwrap_or_default());
        if sender.is_empty() {
            return Err(RowError::EmptyAddress("from"));
        }

        let receiver = Address::new(row.to.as_deref().unwrap_or_default());
        if receiver.is_empty() {
            return Err(RowError::EmptyAddress("to"));
        }

        let value = row.value_eth.ok_or(RowError::MissingField("value_eth"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(RowError::InvalidValue(value));
        }

        let tx_hash = row
            .hash
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();

        let timestamp = match row.block_time.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Timestamp::parse(raw),
            _ => Timestamp::Raw(UNKNOWN.to_string()),
        };

        Ok(Transaction {
            tx_hash,
            sender,
            receiver,
            value,
            timestamp,
            token_symbol: NATIVE_TOKEN.to_string(),
        })
    }
}

/// Accept `value_eth` as a JSON number or a numeric string
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawAmount::Number(v)) => Ok(Some(v)),
        Some(RawAmount::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(from: &str, to: &str, value: f64, hash: &str) -> TransactionRow {
        TransactionRow {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            value_eth: Some(value),
            hash: Some(hash.to_string()),
            block_time: Some("2024-03-01 10:15:00.000 UTC".to_string()),
        }
    }

    #[test]
    fn test_valid_row_converts() {
        let tx = Transaction::try_from(&row(" 0xAAA ", "0xBbB", 1.5, "h1")).unwrap();
        assert_eq!(tx.sender.as_str(), "0xaaa");
        assert_eq!(tx.receiver.as_str(), "0xbbb");
        assert_eq!(tx.value, 1.5);
        assert_eq!(tx.tx_hash, "h1");
        assert_eq!(tx.token_symbol, "ETH");
        assert!(matches!(tx.timestamp, Timestamp::Parsed(_)));
    }

    #[test]
    fn test_empty_address_rejected() {
        let mut bad = row("0xaaa", "   ", 1.0, "h1");
        assert_eq!(Transaction::try_from(&bad), Err(RowError::EmptyAddress("to")));

        bad.to = Some("0xbbb".to_string());
        bad.from = None;
        assert_eq!(Transaction::try_from(&bad), Err(RowError::EmptyAddress("from")));
    }

    #[test]
    fn test_missing_value_rejected() {
        let mut bad = row("0xaaa", "0xbbb", 1.0, "h1");
        bad.value_eth = None;
        assert_eq!(Transaction::try_from(&bad), Err(RowError::MissingField("value_eth")));
    }

    #[test]
    fn test_missing_hash_and_time_default_to_unknown() {
        let mut sparse = row("0xaaa", "0xbbb", 0.25, "");
        sparse.block_time = None;
        let tx = Transaction::try_from(&sparse).unwrap();
        assert_eq!(tx.tx_hash, "unknown");
        assert_eq!(tx.timestamp, Timestamp::Raw("unknown".to_string()));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(matches!(Timestamp::parse("2024-03-01T10:15:00Z"), Timestamp::Parsed(_)));
        assert!(matches!(Timestamp::parse("2024-03-01 10:15:00.123 UTC"), Timestamp::Parsed(_)));
        assert_eq!(Timestamp::parse("block 42"), Timestamp::Raw("block 42".to_string()));
    }

    #[test]
    fn test_row_deserializes_string_value() {
        let json = r#"{"from":"0xA","to":"0xB","value_eth":"2.5","hash":"h9","block_time":null}"#;
        let row: TransactionRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.value_eth, Some(2.5));
        assert_eq!(row.block_time, None);

        let sparse: TransactionRow = serde_json::from_str(r#"{"from":"0xA"}"#).unwrap();
        assert_eq!(sparse.to, None);
        assert_eq!(sparse.value_eth, None);
    }
}
