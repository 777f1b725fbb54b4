use chrono::NaiveDate;

use crate::availability::SlotAvailability;
use crate::error::ValidationError;
use crate::models::{Booking, BookingRequest, CatalogItem, OwnedBooking, Selection, SlotTime};

/// Пояснение к повторно показанному шагу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Дата заполнилась, пока пользователь выбирал.
    DateFull,
    Invalid(ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelFailure {
    NotFound,
    Forbidden,
}

/// Что показать пользователю после обработки действия.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    MainMenu,
    Help,
    Categories {
        options: Vec<CatalogItem>,
        notice: Option<Notice>,
    },
    Services {
        selection: Selection,
        options: Vec<CatalogItem>,
        notice: Option<Notice>,
    },
    Dates {
        selection: Selection,
        dates: Vec<NaiveDate>,
        notice: Option<Notice>,
    },
    Times {
        selection: Selection,
        times: Vec<SlotAvailability>,
        notice: Option<Notice>,
    },
    AskContact {
        selection: Selection,
        saved_contact: Option<String>,
        notice: Option<Notice>,
    },
    Confirm(BookingRequest),
    Booked(Booking),
    SlotTaken {
        date: NaiveDate,
        time: SlotTime,
    },
    AlreadyBooked {
        date: NaiveDate,
        time: SlotTime,
    },
    NoAvailability,
    Abandoned,
    SessionExpired,
    MyBookings(Vec<Booking>),
    AllBookings(Vec<OwnedBooking>),
    BookingCancelled(Booking),
    CancelRejected(CancelFailure),
    AccessDenied,
}

impl Reply {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Reply::Categories { notice, .. }
            | Reply::Services { notice, .. }
            | Reply::Dates { notice, .. }
            | Reply::Times { notice, .. }
            | Reply::AskContact { notice, .. } => notice.as_ref(),
            _ => None,
        }
    }
}
