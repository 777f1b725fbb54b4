use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StorageError;
use crate::models::catalog::{describe_service, CatalogItem};
use crate::models::time_slot::SlotTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Active)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BookingStatus::Active),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown status {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub service: String,
    pub category_key: Option<String>,
    pub service_key: Option<String>,
    pub phone: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Полностью собранная заявка, которую диалог передаёт в реестр.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub user_id: i64,
    pub category: CatalogItem,
    pub service: CatalogItem,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub phone: String,
}

impl BookingRequest {
    pub fn service_description(&self) -> String {
        describe_service(&self.category, &self.service)
    }
}

/// Активная бронь с именем владельца для списка администратора.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBooking {
    pub booking: Booking,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct BookingRow {
    pub id: i64,
    pub user_id: i64,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub service: String,
    pub category_key: Option<String>,
    pub service_key: Option<String>,
    pub phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StorageError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let time = row
            .booking_time
            .parse::<SlotTime>()
            .map_err(|e| StorageError::CorruptRow {
                id: row.id,
                reason: e.to_string(),
            })?;
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|reason| StorageError::CorruptRow { id: row.id, reason })?;

        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            date: row.booking_date,
            time,
            service: row.service,
            category_key: row.category_key,
            service_key: row.service_key,
            phone: row.phone,
            status,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OwnedBookingRow {
    #[sqlx(flatten)]
    pub booking: BookingRow,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl TryFrom<OwnedBookingRow> for OwnedBooking {
    type Error = StorageError;

    fn try_from(row: OwnedBookingRow) -> Result<Self, Self::Error> {
        Ok(OwnedBooking {
            booking: Booking::try_from(row.booking)?,
            first_name: row.first_name,
            username: row.username,
        })
    }
}
