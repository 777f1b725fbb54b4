//! Диалог записи: пошаговый выбор категории, услуги, даты, времени и
//! телефона с возможностью вернуться на шаг назад.

pub mod action;
pub mod reply;
pub mod sessions;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::availability::AvailabilityCalculator;
use crate::config::Config;
use crate::database::{BookingLedger, CancelOutcome, Database, Requester, ReserveOutcome};
use crate::error::{FlowError, ValidationError};
use crate::models::time_slot::parse_date;
use crate::models::{BookingRequest, Catalog, CatalogItem, Selection, SlotTime, Step, User, UserRef};
use crate::notifier::{BookingEvent, BookingNotice, Notifier};
use crate::phone;

pub use action::Action;
pub use reply::{CancelFailure, Notice, Reply};
pub use sessions::{Session, SessionStore};

/// Результат перехода: новый шаг (`None`, если сессия завершена) и ответ.
type Transition = (Option<Step>, Reply);

#[derive(Clone)]
pub struct SelectionFlow {
    db: Database,
    ledger: BookingLedger,
    availability: AvailabilityCalculator,
    catalog: Arc<Catalog>,
    notifier: Arc<dyn Notifier>,
    sessions: SessionStore,
    admin_user_id: Option<i64>,
}

impl SelectionFlow {
    pub fn new(config: &Config, db: Database, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = BookingLedger::new(db.clone(), config.slot_capacity);
        let availability = AvailabilityCalculator::new(config.schedule(), ledger.clone(), config.days_ahead);

        Self {
            db,
            ledger,
            availability,
            catalog: Arc::new(config.catalog.clone()),
            notifier,
            sessions: SessionStore::new(config.session_ttl),
            admin_user_id: config.admin_user_id,
        }
    }

    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Обрабатывает одно действие пользователя. При ошибке хранилища
    /// сессия прерывается и ни в какое успешное состояние не переходит.
    pub async fn handle(&self, user: &UserRef, action: Action, now: NaiveDateTime) -> Result<Reply, FlowError> {
        let slot = self.sessions.slot(user.id).await;
        let mut guard = slot.lock().await;

        let current = guard
            .take()
            .filter(|session| !session.is_expired(self.sessions.ttl()))
            .map(|session| session.step);

        if action.keeps_session() {
            // Сессию возвращаем до запроса в хранилище, чтобы ошибка её не потеряла
            *guard = current.map(Session::new);
            drop(guard);
            return self.handle_outside_flow(user, action).await;
        }

        let from = current.as_ref().map(Step::name).unwrap_or("idle");
        let (next, reply) = self.transition(user, current, action, now).await?;

        log::debug!(
            "User {}: {} -> {}",
            user.id,
            from,
            next.as_ref().map(Step::name).unwrap_or("idle")
        );

        *guard = next.map(Session::new);
        Ok(reply)
    }

    async fn transition(
        &self,
        user: &UserRef,
        current: Option<Step>,
        action: Action,
        now: NaiveDateTime,
    ) -> Result<Transition, FlowError> {
        let today = now.date();

        match (current, action) {
            (_, Action::Start) => {
                User::upsert(&self.db, user).await?;
                Ok(self.enter_categories(None))
            }
            (_, Action::Home) => Ok((None, Reply::MainMenu)),

            (Some(Step::ChoosingCategory), Action::PickCategory(key)) => match self.catalog.category(&key) {
                Some(category) => Ok(self.enter_services(category.clone(), None)),
                None => Ok(self.enter_categories(Some(invalid(ValidationError::UnknownOption(key))))),
            },
            (Some(Step::ChoosingCategory), Action::Back) => Ok((None, Reply::MainMenu)),

            (Some(Step::ChoosingService { category }), Action::PickService(key)) => {
                match self.catalog.service(&key).cloned() {
                    Some(service) => self.enter_dates(category, service, now, None).await,
                    None => Ok(self.enter_services(
                        category,
                        Some(invalid(ValidationError::UnknownOption(key))),
                    )),
                }
            }
            (Some(Step::ChoosingService { .. }), Action::Back) => Ok(self.enter_categories(None)),

            (Some(Step::ChoosingDate { category, service }), Action::PickDate(raw)) => {
                let date = match parse_date(&raw) {
                    Ok(date) => date,
                    Err(e) => return self.enter_dates(category, service, now, Some(invalid(e))).await,
                };
                if !self.availability.is_within_window(date, today) {
                    let notice = invalid(ValidationError::DateOutOfWindow);
                    return self.enter_dates(category, service, now, Some(notice)).await;
                }
                self.enter_times(category, service, date, now, None).await
            }
            (Some(Step::ChoosingDate { category, .. }), Action::Back) => Ok(self.enter_services(category, None)),

            (Some(Step::ChoosingTime { category, service, date }), Action::PickTime(raw)) => {
                let time = match raw.parse::<SlotTime>() {
                    Ok(time) => time,
                    Err(e) => return self.enter_times(category, service, date, now, Some(invalid(e))).await,
                };

                // Список времени пересчитываем: он мог устареть с момента показа
                let times = self.availability.available_times(date, now).await?;
                if times.iter().any(|slot| slot.time == time) {
                    self.enter_contact(user, category, service, date, time, None).await
                } else {
                    let notice = invalid(ValidationError::TimeUnavailable);
                    self.enter_times(category, service, date, now, Some(notice)).await
                }
            }
            (Some(Step::ChoosingTime { category, service, .. }), Action::Back) => {
                self.enter_dates(category, service, now, None).await
            }

            (Some(Step::EnteringContact { category, service, date, time }), Action::TextInput(text)) => {
                self.submit_contact(user, category, service, date, time, text.trim()).await
            }
            (Some(Step::EnteringContact { category, service, date, time }), Action::UseSavedContact) => {
                let saved = User::find(&self.db, user.id).await?.and_then(|u| u.phone);
                match saved {
                    Some(phone) => self.submit_contact(user, category, service, date, time, &phone).await,
                    None => {
                        let notice = invalid(ValidationError::NoSavedContact);
                        self.enter_contact(user, category, service, date, time, Some(notice)).await
                    }
                }
            }
            (Some(Step::EnteringContact { category, service, date, .. }), Action::Back) => {
                self.enter_times(category, service, date, now, None).await
            }

            (Some(Step::AwaitingConfirmation(request)), Action::Confirm(true)) => self.confirm(user, request, now).await,
            (Some(Step::AwaitingConfirmation(_)), Action::Confirm(false)) => Ok((None, Reply::Abandoned)),
            (Some(Step::AwaitingConfirmation(request)), Action::Back) => {
                let BookingRequest { category, service, date, time, .. } = request;
                self.enter_contact(user, category, service, date, time, None).await
            }

            (None, Action::TextInput(_)) => Ok((None, Reply::MainMenu)),
            (None, _) => Ok((None, Reply::SessionExpired)),
            (Some(step), _) => self.rerender(user, step, now, invalid(ValidationError::UnexpectedAction)).await,
        }
    }

    fn enter_categories(&self, notice: Option<Notice>) -> Transition {
        (
            Some(Step::ChoosingCategory),
            Reply::Categories {
                options: self.catalog.categories.clone(),
                notice,
            },
        )
    }

    fn enter_services(&self, category: CatalogItem, notice: Option<Notice>) -> Transition {
        let step = Step::ChoosingService { category };
        let reply = Reply::Services {
            selection: Selection::from(&step),
            options: self.catalog.services.clone(),
            notice,
        };
        (Some(step), reply)
    }

    /// Даты всегда запрашиваются заново; пустой список завершает сессию.
    async fn enter_dates(
        &self,
        category: CatalogItem,
        service: CatalogItem,
        now: NaiveDateTime,
        notice: Option<Notice>,
    ) -> Result<Transition, FlowError> {
        let dates = self.availability.bookable_dates(now).await?;
        if dates.is_empty() {
            log::info!("No available dates from {}", now.date());
            return Ok((None, Reply::NoAvailability));
        }

        let step = Step::ChoosingDate { category, service };
        let reply = Reply::Dates {
            selection: Selection::from(&step),
            dates,
            notice,
        };
        Ok((Some(step), reply))
    }

    /// Если на дату не осталось времени, возвращаемся к выбору даты.
    async fn enter_times(
        &self,
        category: CatalogItem,
        service: CatalogItem,
        date: NaiveDate,
        now: NaiveDateTime,
        notice: Option<Notice>,
    ) -> Result<Transition, FlowError> {
        let times = self.availability.available_times(date, now).await?;
        if times.is_empty() {
            return self
                .enter_dates(category, service, now, Some(Notice::DateFull))
                .await;
        }

        let step = Step::ChoosingTime { category, service, date };
        let reply = Reply::Times {
            selection: Selection::from(&step),
            times,
            notice,
        };
        Ok((Some(step), reply))
    }

    async fn enter_contact(
        &self,
        user: &UserRef,
        category: CatalogItem,
        service: CatalogItem,
        date: NaiveDate,
        time: SlotTime,
        notice: Option<Notice>,
    ) -> Result<Transition, FlowError> {
        let saved_contact = User::find(&self.db, user.id)
            .await?
            .and_then(|u| u.phone)
            .filter(|p| phone::is_valid(p));

        let step = Step::EnteringContact { category, service, date, time };
        let reply = Reply::AskContact {
            selection: Selection::from(&step),
            saved_contact,
            notice,
        };
        Ok((Some(step), reply))
    }

    async fn submit_contact(
        &self,
        user: &UserRef,
        category: CatalogItem,
        service: CatalogItem,
        date: NaiveDate,
        time: SlotTime,
        contact: &str,
    ) -> Result<Transition, FlowError> {
        if !phone::is_valid(contact) {
            let notice = invalid(ValidationError::InvalidContact);
            return self.enter_contact(user, category, service, date, time, Some(notice)).await;
        }

        // Телефон сохраняем сразу, даже если запись не будет подтверждена
        User::update_phone(&self.db, user, contact).await?;

        let request = BookingRequest {
            user_id: user.id,
            category,
            service,
            date,
            time,
            phone: contact.to_string(),
        };
        Ok((
            Some(Step::AwaitingConfirmation(request.clone())),
            Reply::Confirm(request),
        ))
    }

    async fn confirm(
        &self,
        user: &UserRef,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Transition, FlowError> {
        // Подтверждение могло прийти, когда слот уже начался
        if request.time.on(request.date) <= now {
            log::info!(
                "⛔ Slot {} {} already started, user {} rejected",
                request.date, request.time, request.user_id
            );
            return Ok((
                None,
                Reply::SlotTaken {
                    date: request.date,
                    time: request.time,
                },
            ));
        }

        match self.ledger.reserve(&request).await? {
            ReserveOutcome::Reserved(booking) => {
                self.notifier
                    .notify(BookingEvent::BookingCreated(BookingNotice::new(user, &booking)))
                    .await;
                Ok((None, Reply::Booked(booking)))
            }
            ReserveOutcome::SlotFull => Ok((
                None,
                Reply::SlotTaken {
                    date: request.date,
                    time: request.time,
                },
            )),
            ReserveOutcome::AlreadyBooked => Ok((
                None,
                Reply::AlreadyBooked {
                    date: request.date,
                    time: request.time,
                },
            )),
        }
    }

    /// Повторно показывает текущий шаг со свежими вариантами.
    async fn rerender(
        &self,
        user: &UserRef,
        step: Step,
        now: NaiveDateTime,
        notice: Notice,
    ) -> Result<Transition, FlowError> {
        match step {
            Step::ChoosingCategory => Ok(self.enter_categories(Some(notice))),
            Step::ChoosingService { category } => Ok(self.enter_services(category, Some(notice))),
            Step::ChoosingDate { category, service } => {
                self.enter_dates(category, service, now, Some(notice)).await
            }
            Step::ChoosingTime { category, service, date } => {
                self.enter_times(category, service, date, now, Some(notice)).await
            }
            Step::EnteringContact { category, service, date, time } => {
                self.enter_contact(user, category, service, date, time, Some(notice)).await
            }
            Step::AwaitingConfirmation(request) => Ok((
                Some(Step::AwaitingConfirmation(request.clone())),
                Reply::Confirm(request),
            )),
        }
    }

    async fn handle_outside_flow(&self, user: &UserRef, action: Action) -> Result<Reply, FlowError> {
        match action {
            Action::Help => Ok(Reply::Help),
            Action::ListMyBookings => {
                let bookings = self.ledger.active_bookings_for_user(user.id).await?;
                Ok(Reply::MyBookings(bookings))
            }
            Action::AdminListAll => {
                if !self.is_admin(user.id) {
                    log::warn!("User {} tried to list all bookings", user.id);
                    return Ok(Reply::AccessDenied);
                }
                Ok(Reply::AllBookings(self.ledger.all_active_bookings().await?))
            }
            Action::CancelBooking(booking_id) => self.cancel_booking(user, booking_id).await,
            _ => Ok(Reply::MainMenu),
        }
    }

    async fn cancel_booking(&self, user: &UserRef, booking_id: i64) -> Result<Reply, FlowError> {
        let requester = if self.is_admin(user.id) {
            Requester::Admin
        } else {
            Requester::User(user.id)
        };

        match self.ledger.cancel(booking_id, requester).await? {
            CancelOutcome::Cancelled(booking) => {
                let owner = if booking.user_id == user.id {
                    user.clone()
                } else {
                    match User::find(&self.db, booking.user_id).await? {
                        Some(u) => UserRef {
                            id: u.user_id,
                            first_name: u.first_name,
                            username: u.username,
                        },
                        None => UserRef {
                            id: booking.user_id,
                            first_name: "Неизвестно".to_string(),
                            username: None,
                        },
                    }
                };
                self.notifier
                    .notify(BookingEvent::BookingCancelled(BookingNotice::new(&owner, &booking)))
                    .await;
                Ok(Reply::BookingCancelled(booking))
            }
            CancelOutcome::NotFound => Ok(Reply::CancelRejected(CancelFailure::NotFound)),
            CancelOutcome::Forbidden => Ok(Reply::CancelRejected(CancelFailure::Forbidden)),
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_id == Some(user_id)
    }
}

fn invalid(error: ValidationError) -> Notice {
    Notice::Invalid(error)
}
