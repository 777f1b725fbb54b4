use chrono::NaiveDate;

use crate::models::booking::BookingRequest;
use crate::models::catalog::CatalogItem;
use crate::models::time_slot::SlotTime;

/// Шаг диалога записи. Каждый вариант хранит ровно те поля,
/// которые уже выбраны, поэтому пропустить шаг невозможно.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    ChoosingCategory,
    ChoosingService {
        category: CatalogItem,
    },
    ChoosingDate {
        category: CatalogItem,
        service: CatalogItem,
    },
    ChoosingTime {
        category: CatalogItem,
        service: CatalogItem,
        date: NaiveDate,
    },
    EnteringContact {
        category: CatalogItem,
        service: CatalogItem,
        date: NaiveDate,
        time: SlotTime,
    },
    AwaitingConfirmation(BookingRequest),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::ChoosingCategory => "choosing_category",
            Step::ChoosingService { .. } => "choosing_service",
            Step::ChoosingDate { .. } => "choosing_date",
            Step::ChoosingTime { .. } => "choosing_time",
            Step::EnteringContact { .. } => "entering_contact",
            Step::AwaitingConfirmation(_) => "awaiting_confirmation",
        }
    }
}

/// Текущий выбор, который показывается пользователю над списком вариантов.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub category: Option<CatalogItem>,
    pub service: Option<CatalogItem>,
    pub date: Option<NaiveDate>,
    pub time: Option<SlotTime>,
}

impl From<&Step> for Selection {
    fn from(step: &Step) -> Self {
        match step {
            Step::ChoosingCategory => Selection::default(),
            Step::ChoosingService { category } => Selection {
                category: Some(category.clone()),
                ..Selection::default()
            },
            Step::ChoosingDate { category, service } => Selection {
                category: Some(category.clone()),
                service: Some(service.clone()),
                ..Selection::default()
            },
            Step::ChoosingTime { category, service, date } => Selection {
                category: Some(category.clone()),
                service: Some(service.clone()),
                date: Some(*date),
                time: None,
            },
            Step::EnteringContact { category, service, date, time } => Selection {
                category: Some(category.clone()),
                service: Some(service.clone()),
                date: Some(*date),
                time: Some(*time),
            },
            Step::AwaitingConfirmation(request) => Selection {
                category: Some(request.category.clone()),
                service: Some(request.service.clone()),
                date: Some(request.date),
                time: Some(request.time),
            },
        }
    }
}
