use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::database::BookingLedger;
use crate::error::StorageError;
use crate::models::{ScheduleTemplate, SlotTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAvailability {
    pub time: SlotTime,
    pub remaining: u32,
}

/// Свободные даты и время: шаблон расписания плюс занятость из реестра.
#[derive(Clone, Debug)]
pub struct AvailabilityCalculator {
    schedule: ScheduleTemplate,
    ledger: BookingLedger,
    days_ahead: u32,
}

impl AvailabilityCalculator {
    pub fn new(schedule: ScheduleTemplate, ledger: BookingLedger, days_ahead: u32) -> Self {
        Self {
            schedule,
            ledger,
            days_ahead,
        }
    }

    pub fn is_within_window(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match today.checked_add_days(Days::new(u64::from(self.days_ahead))) {
            Some(end) => date >= today && date < end,
            None => date >= today,
        }
    }

    pub async fn available_dates(&self, today: NaiveDate) -> Result<Vec<NaiveDate>, StorageError> {
        let mut dates = Vec::new();

        for date in today.iter_days().take(self.days_ahead as usize) {
            let slots = self.schedule.slots_for(date);
            if slots.is_empty() {
                continue;
            }

            let remaining = self.ledger.remaining_capacities(date, &slots).await?;
            if remaining.iter().any(|(_, left)| *left > 0) {
                dates.push(date);
            }
        }

        Ok(dates)
    }

    /// Даты для показа пользователю: как `available_dates`, но сегодняшний
    /// день убирается, если на него не осталось будущего свободного времени.
    pub async fn bookable_dates(&self, now: NaiveDateTime) -> Result<Vec<NaiveDate>, StorageError> {
        let today = now.date();
        let mut dates = self.available_dates(today).await?;

        if dates.first() == Some(&today) && self.available_times(today, now).await?.is_empty() {
            dates.remove(0);
        }

        Ok(dates)
    }

    /// Для сегодняшней даты отбрасываются слоты, которые не позже `now`.
    pub async fn available_times(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<SlotAvailability>, StorageError> {
        let is_today = date == now.date();
        let slots: Vec<SlotTime> = self
            .schedule
            .slots_for(date)
            .into_iter()
            .filter(|slot| !is_today || slot.on(date) > now)
            .collect();

        let remaining = self.ledger.remaining_capacities(date, &slots).await?;

        Ok(remaining
            .into_iter()
            .filter(|(_, left)| *left > 0)
            .map(|(time, remaining)| SlotAvailability { time, remaining })
            .collect())
    }
}
