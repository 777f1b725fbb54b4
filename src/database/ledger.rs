use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::database::Database;
use crate::error::StorageError;
use crate::models::booking::{BookingRow, OwnedBookingRow};
use crate::models::{Booking, BookingRequest, OwnedBooking, SlotTime};

const BOOKING_COLUMNS: &str = "id, user_id, booking_date, booking_time, service, category_key, \
     service_key, phone, status, created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Booking),
    SlotFull,
    AlreadyBooked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(Booking),
    NotFound,
    Forbidden,
}

/// От чьего имени выполняется отмена.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    User(i64),
    Admin,
}

/// Реестр броней. Единственный источник правды о занятости слотов.
#[derive(Clone, Debug)]
pub struct BookingLedger {
    db: Database,
    capacity: u32,
}

impl BookingLedger {
    pub fn new(db: Database, capacity: u32) -> Self {
        Self { db, capacity }
    }

    pub async fn remaining_capacity(&self, date: NaiveDate, time: SlotTime) -> Result<u32, StorageError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE booking_date = ? AND booking_time = ? AND status = 'active'",
        )
        .bind(date)
        .bind(time.to_string())
        .fetch_one(&self.db.pool)
        .await?;

        Ok(self.remaining_from(count))
    }

    /// Остаток мест для каждого слота дня одним запросом, в порядке `slots`.
    pub async fn remaining_capacities(
        &self,
        date: NaiveDate,
        slots: &[SlotTime],
    ) -> Result<Vec<(SlotTime, u32)>, StorageError> {
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT booking_time, COUNT(*) FROM bookings
            WHERE booking_date = ? AND status = 'active'
            GROUP BY booking_time
            "#,
        )
        .bind(date)
        .fetch_all(&self.db.pool)
        .await?;

        let counts: HashMap<String, i64> = rows.into_iter().collect();

        Ok(slots
            .iter()
            .map(|slot| {
                let taken = counts.get(&slot.to_string()).copied().unwrap_or(0);
                (*slot, self.remaining_from(taken))
            })
            .collect())
    }

    /// Проверка вместимости и вставка выполняются одним оператором внутри
    /// пишущей транзакции, поэтому конкурентные записи на один слот
    /// не могут превысить вместимость.
    pub async fn reserve(&self, request: &BookingRequest) -> Result<ReserveOutcome, StorageError> {
        let time = request.time.to_string();
        let mut tx = self.db.pool.begin().await?;

        let inserted = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings
                (user_id, booking_date, booking_time, service, category_key, service_key, phone, status, created_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, 'active', ?
            WHERE (
                SELECT COUNT(*) FROM bookings
                WHERE booking_date = ? AND booking_time = ? AND status = 'active'
            ) < ?
            AND NOT EXISTS (
                SELECT 1 FROM bookings
                WHERE booking_date = ? AND booking_time = ? AND user_id = ? AND status = 'active'
            )
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.date)
        .bind(&time)
        .bind(request.service_description())
        .bind(&request.category.key)
        .bind(&request.service.key)
        .bind(&request.phone)
        .bind(Utc::now())
        .bind(request.date)
        .bind(&time)
        .bind(i64::from(self.capacity))
        .bind(request.date)
        .bind(&time)
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(row) => ReserveOutcome::Reserved(Booking::try_from(row)?),
            None => {
                // Блокировка записи ещё у нас, так что причина отказа точная
                let (already,): (bool,) = sqlx::query_as(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM bookings
                        WHERE booking_date = ? AND booking_time = ? AND user_id = ? AND status = 'active'
                    )
                    "#,
                )
                .bind(request.date)
                .bind(&time)
                .bind(request.user_id)
                .fetch_one(&mut *tx)
                .await?;

                if already {
                    ReserveOutcome::AlreadyBooked
                } else {
                    ReserveOutcome::SlotFull
                }
            }
        };

        tx.commit().await?;

        match &outcome {
            ReserveOutcome::Reserved(booking) => log::info!(
                "✅ Booking {} created: user {} at {} {}",
                booking.id, booking.user_id, booking.date, booking.time
            ),
            ReserveOutcome::SlotFull => log::info!(
                "⛔ Slot {} {} is full, user {} rejected",
                request.date, request.time, request.user_id
            ),
            ReserveOutcome::AlreadyBooked => log::info!(
                "⛔ User {} already holds {} {}",
                request.user_id, request.date, request.time
            ),
        }

        Ok(outcome)
    }

    pub async fn cancel(&self, booking_id: i64, requester: Requester) -> Result<CancelOutcome, StorageError> {
        let (owner, is_admin) = match requester {
            Requester::User(user_id) => (user_id, false),
            Requester::Admin => (0, true),
        };

        let cancelled = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings SET status = 'cancelled'
            WHERE id = ? AND status = 'active' AND (user_id = ? OR ?)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(owner)
        .bind(is_admin)
        .fetch_optional(&self.db.pool)
        .await?;

        if let Some(row) = cancelled {
            let booking = Booking::try_from(row)?;
            log::info!("🗑️ Booking {} cancelled by {:?}", booking.id, requester);
            return Ok(CancelOutcome::Cancelled(booking));
        }

        let outcome = match self.find(booking_id).await? {
            Some(booking) if booking.status.is_active() && !is_admin && booking.user_id != owner => {
                CancelOutcome::Forbidden
            }
            _ => CancelOutcome::NotFound,
        };

        log::warn!("Cancel of booking {} by {:?} rejected: {:?}", booking_id, requester, outcome);
        Ok(outcome)
    }

    pub async fn find(&self, booking_id: i64) -> Result<Option<Booking>, StorageError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
        ))
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    pub async fn active_bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>, StorageError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = ? AND status = 'active'
            ORDER BY booking_date, booking_time
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    pub async fn all_active_bookings(&self) -> Result<Vec<OwnedBooking>, StorageError> {
        let rows = sqlx::query_as::<_, OwnedBookingRow>(
            r#"
            SELECT b.id, b.user_id, b.booking_date, b.booking_time, b.service, b.category_key,
                   b.service_key, b.phone, b.status, b.created_at, u.first_name, u.username
            FROM bookings b
            LEFT JOIN users u ON u.user_id = b.user_id
            WHERE b.status = 'active'
            ORDER BY b.booking_date, b.booking_time
            "#,
        )
        .fetch_all(&self.db.pool)
        .await?;

        rows.into_iter().map(OwnedBooking::try_from).collect()
    }

    /// Переводит в `completed` активные брони, чей слот строго раньше `now`.
    /// Будущие слоты не затрагиваются, повторный запуск ничего не меняет.
    pub async fn expire_stale_past_bookings(&self, now: NaiveDateTime) -> Result<u64, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET status = 'completed'
            WHERE status = 'active'
            AND (booking_date || ' ' || booking_time || ':00') < ?
            "#,
        )
        .bind(now.format("%Y-%m-%d %H:%M:%S").to_string())
        .execute(&self.db.pool)
        .await?;

        Ok(result.rows_affected())
    }

    fn remaining_from(&self, taken: i64) -> u32 {
        let taken = u32::try_from(taken.max(0)).unwrap_or(u32::MAX);
        self.capacity.saturating_sub(taken)
    }
}
