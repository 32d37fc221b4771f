use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RawRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    pub industry: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub location: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Staff,
}

impl MemberRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Staff => "staff",
        }
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "staff" => Ok(MemberRole::Staff),
            other => Err(format!("unknown member role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessMember {
    pub business_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Which canonical entity a raw row was uploaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Product,
    Sale,
}

impl RecordKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Product => "product",
            RecordKind::Sale => "sale",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(RecordKind::Product),
            "sale" => Ok(RecordKind::Sale),
            other => Err(format!("unknown record kind: {other}")),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a raw record. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Raw,
    Cleaning,
    Cleaned,
    Error,
}

impl RecordStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Raw => "raw",
            RecordStatus::Cleaning => "cleaning",
            RecordStatus::Cleaned => "cleaned",
            RecordStatus::Error => "error",
        }
    }

    /// Statuses a record may be in immediately before entering `self`.
    #[must_use]
    pub const fn predecessors(self) -> &'static [RecordStatus] {
        match self {
            RecordStatus::Raw => &[],
            RecordStatus::Cleaning => &[RecordStatus::Raw],
            RecordStatus::Cleaned | RecordStatus::Error => {
                &[RecordStatus::Raw, RecordStatus::Cleaning]
            }
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        next.predecessors().contains(&self)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Cleaned | RecordStatus::Error)
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(RecordStatus::Raw),
            "cleaning" => Ok(RecordStatus::Cleaning),
            "cleaned" => Ok(RecordStatus::Cleaned),
            "error" => Ok(RecordStatus::Error),
            other => Err(format!("unknown record status: {other}")),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub business_id: String,
    pub kind: RecordKind,
    pub raw_row: RawRow,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub business_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub category: String,
    pub price: f64,
    pub cost_price: f64,
    pub attributes: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of an upsert keyed by (business, name).
#[derive(Debug, Clone)]
pub enum Upserted<T> {
    Created(T),
    Updated(T),
}

impl<T> Upserted<T> {
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(v) | Upserted::Updated(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: String,
    pub business_id: String,
    pub product_id: String,
    pub product_name: String,
    pub date: NaiveDate,
    pub quantity: i64,
    pub revenue: f64,
    pub channel: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub business_id: String,
    pub goal: String,
    pub budget: f64,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        assert!(RecordStatus::Raw.can_transition_to(RecordStatus::Cleaning));
        assert!(RecordStatus::Raw.can_transition_to(RecordStatus::Cleaned));
        assert!(RecordStatus::Raw.can_transition_to(RecordStatus::Error));
        assert!(RecordStatus::Cleaning.can_transition_to(RecordStatus::Cleaned));

        assert!(!RecordStatus::Cleaned.can_transition_to(RecordStatus::Raw));
        assert!(!RecordStatus::Error.can_transition_to(RecordStatus::Cleaned));
        assert!(!RecordStatus::Cleaning.can_transition_to(RecordStatus::Raw));
        assert!(!RecordStatus::Raw.can_transition_to(RecordStatus::Raw));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            RecordStatus::Raw,
            RecordStatus::Cleaning,
            RecordStatus::Cleaned,
            RecordStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<RecordStatus>().unwrap(), status);
        }
        assert!("pending".parse::<RecordStatus>().is_err());
    }
}
