//! Data models shared with the transaction store

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Store-assigned transaction identifier
pub type TransactionId = i64;

/// Account snapshot as reported by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account number, unique and sortable
    pub account_number: String,
    /// Holder name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub account_holder: String,
    /// Balance as computed by the store
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Move money between two accounts
    Transfer,
    /// Money into an account
    Deposit,
    /// Money out of an account
    Withdrawal,
    /// Legacy income entry, carries no accounts
    Income,
    /// Legacy expense entry, carries no accounts
    Expense,
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Transfer
    }
}

impl TransactionType {
    /// Whether this kind comes from the older account-less form
    pub fn is_legacy(&self) -> bool {
        matches!(self, TransactionType::Income | TransactionType::Expense)
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRANSFER" => Ok(TransactionType::Transfer),
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Transfer => write!(f, "TRANSFER"),
            TransactionType::Deposit => write!(f, "DEPOSIT"),
            TransactionType::Withdrawal => write!(f, "WITHDRAWAL"),
            TransactionType::Income => write!(f, "INCOME"),
            TransactionType::Expense => write!(f, "EXPENSE"),
        }
    }
}

/// Whether a transaction may still be edited or deleted.
///
/// On the wire this is `modifyFlg`: `"0"` for mutable, `"1"` once the store
/// has locked the row. Booleans and bare integers are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Mutable,
    Locked,
}

impl Serialize for Mutability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Mutability::Mutable => "0",
            Mutability::Locked => "1",
        })
    }
}

impl<'de> Deserialize<'de> for Mutability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
            Flag(bool),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(Mutability::Mutable),
            Some(Raw::Text(s)) => match s.trim() {
                "0" | "" => Ok(Mutability::Mutable),
                "1" => Ok(Mutability::Locked),
                other => Err(serde::de::Error::custom(format!(
                    "invalid modifyFlg value: {}",
                    other
                ))),
            },
            Some(Raw::Number(0) | Raw::Flag(false)) => Ok(Mutability::Mutable),
            Some(Raw::Number(1) | Raw::Flag(true)) => Ok(Mutability::Locked),
            Some(Raw::Number(n)) => Err(serde::de::Error::custom(format!(
                "invalid modifyFlg value: {}",
                n
            ))),
        }
    }
}

/// Transaction as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Reversal rows written by the store carry `null` here
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Occurrence time
    #[serde(rename = "date", alias = "timestamp", with = "wire_time")]
    pub timestamp: NaiveDateTime,
    /// Source account, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account_number: Option<String>,
    /// Destination account, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_number: Option<String>,
    #[serde(rename = "modifyFlg", default)]
    pub mutability: Mutability,
}

impl Transaction {
    /// Whether local edit/delete is permitted
    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mutable
    }

    /// Check if the transaction touches an account on either side
    pub fn involves_account(&self, account_number: &str) -> bool {
        self.from_account_number.as_deref() == Some(account_number)
            || self.to_account_number.as_deref() == Some(account_number)
    }
}

/// Body of `POST /transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_number: Option<String>,
    #[serde(with = "wire_time")]
    pub timestamp: NaiveDateTime,
}

/// Optional narrowing of the transaction list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Only this kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    /// Only rows touching this account number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.account.is_none()
    }

    /// Query parameters understood by the store
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(kind) = self.kind {
            pairs.push(("type", kind.to_string()));
        }
        if let Some(account) = &self.account {
            pairs.push(("accountId", account.clone()));
        }
        pairs
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamp format used by the store: `yyyy-MM-dd'T'HH:mm:ss'Z'`.
///
/// Reading also accepts fractional seconds and full RFC 3339 offsets.
pub mod wire_time {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
    }
}
