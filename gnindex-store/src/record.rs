use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp-derived migration identifier, also the ordering key.
///
/// Ids usually encode their creation time as `YYYYMMDDhhmmss`
/// (`20170916133024`), but any positive integer is accepted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
#[cfg_attr(feature = "pg", derive(sqlx::Type))]
#[cfg_attr(feature = "pg", sqlx(transparent))]
pub struct MigrationId(pub i64);

impl MigrationId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        Self(
            i64::from(timestamp.year()) * 10_000_000_000
                + i64::from(timestamp.month()) * 100_000_000
                + i64::from(timestamp.day()) * 1_000_000
                + i64::from(timestamp.hour()) * 10_000
                + i64::from(timestamp.minute()) * 100
                + i64::from(timestamp.second()),
        )
    }

    /// Decodes a `YYYYMMDDhhmmss` id; `None` for ids of any other shape.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let value = self.0.to_string();

        if value.len() != 14 {
            return None;
        }

        NaiveDateTime::parse_from_str(&value, "%Y%m%d%H%M%S").ok()
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MigrationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for MigrationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A row of the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pg", derive(sqlx::FromRow))]
pub struct AppliedMigration {
    pub migration_id: MigrationId,
    pub applied_at: DateTime<Utc>,
}
