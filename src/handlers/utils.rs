use chrono::{Datelike, NaiveDate};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::availability::SlotAvailability;
use crate::error::ValidationError;
use crate::flow::{CancelFailure, Notice, Reply};
use crate::models::{Booking, BookingRequest, CatalogItem, OwnedBooking, Selection};

/// Лимит Telegram на длину сообщения с запасом.
pub const MESSAGE_LIMIT: usize = 4000;

/// Экранирование MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\'];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown_v2(text))
}

pub fn day_name(date: NaiveDate) -> &'static str {
    const DAYS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];
    DAYS[date.weekday().num_days_from_monday() as usize]
}

/// Дата для людей: `Вт, 02.01.2024`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}, {}", day_name(date), date.format("%d.%m.%Y"))
}

/// Текст и клавиатура, готовые к отправке.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Rendered {
    fn new(text: String, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text,
            keyboard: Some(keyboard),
        }
    }
}

/// Главное меню
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📝 Записаться", "book")],
        vec![InlineKeyboardButton::callback("📋 Мои записи", "my_bookings")],
        vec![InlineKeyboardButton::callback("❓ Помощь", "help")],
    ])
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![
        InlineKeyboardButton::callback("⬅️ Назад", "back"),
        InlineKeyboardButton::callback("🏠 Меню", "home"),
    ]
}

fn options_keyboard(options: &[CatalogItem], prefix: &str) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .map(|item| {
            vec![InlineKeyboardButton::callback(
                item.name.clone(),
                format!("{}{}", prefix, item.key),
            )]
        })
        .collect();
    keyboard.push(back_row());
    InlineKeyboardMarkup::new(keyboard)
}

fn dates_keyboard(dates: &[NaiveDate]) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = dates
        .iter()
        .map(|date| {
            vec![InlineKeyboardButton::callback(
                format_date(*date),
                format!("date_{}", date.format("%Y-%m-%d")),
            )]
        })
        .collect();
    keyboard.push(back_row());
    InlineKeyboardMarkup::new(keyboard)
}

fn times_keyboard(times: &[SlotAvailability]) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = times
        .iter()
        .map(|slot| {
            vec![InlineKeyboardButton::callback(
                format!("⏰ {} ({} мест)", slot.time, slot.remaining),
                format!("time_{}", slot.time),
            )]
        })
        .collect();
    keyboard.push(back_row());
    InlineKeyboardMarkup::new(keyboard)
}

fn selection_lines(selection: &Selection) -> String {
    let mut lines = Vec::new();
    if let Some(category) = &selection.category {
        lines.push(format!("🚗 Тип кузова: {}", category.name));
    }
    if let Some(service) = &selection.service {
        lines.push(format!("💧 Тип мойки: {}", service.name));
    }
    if let Some(date) = selection.date {
        lines.push(format!("📅 Дата: {}", format_date(date)));
    }
    if let Some(time) = selection.time {
        lines.push(format!("⏰ Время: {}", time));
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n\n", escape_markdown_v2(&lines.join("\n")))
    }
}

fn request_lines(request: &BookingRequest) -> String {
    escape_markdown_v2(&format!(
        "🚗 Тип кузова: {}\n💧 Тип мойки: {}\n📅 Дата: {}\n⏰ Время: {}\n📞 Телефон: {}",
        request.category.name,
        request.service.name,
        format_date(request.date),
        request.time,
        request.phone
    ))
}

fn booking_lines(booking: &Booking) -> String {
    escape_markdown_v2(&format!(
        "🆔 ID: {}\n🚗 Услуга: {}\n📅 Дата: {}\n⏰ Время: {}\n📞 Телефон: {}",
        booking.id,
        booking.service,
        format_date(booking.date),
        booking.time,
        booking.phone
    ))
}

fn notice_text(notice: Option<&Notice>) -> String {
    let text = match notice {
        None => return String::new(),
        Some(Notice::DateFull) => "😞 На эту дату не осталось свободного времени. Выберите другую дату.",
        Some(Notice::Invalid(error)) => match error {
            ValidationError::InvalidContact => {
                "❌ Неверный формат номера телефона. Пожалуйста, введите номер в формате: +7XXXXXXXXXX"
            }
            ValidationError::MalformedDate(_) => "❌ Не удалось распознать дату.",
            ValidationError::MalformedTime(_) => "❌ Не удалось распознать время.",
            ValidationError::DateOutOfWindow => "❌ На эту дату запись недоступна.",
            ValidationError::TimeUnavailable => "❌ Это время уже недоступно. Выберите другое.",
            ValidationError::UnknownOption(_) => "❌ Такого варианта нет.",
            ValidationError::UnexpectedAction => "ℹ️ Сначала завершите текущий шаг.",
            ValidationError::NoSavedContact => "ℹ️ Сохранённого номера нет, введите его вручную.",
        },
    };
    format!("{}\n\n", escape_markdown_v2(text))
}

fn help_text() -> String {
    let body = "Основные команды:\n\
        /start - запустить бота и вернуться в главное меню\n\
        /help - показать эту инструкцию\n\
        /mybookings - ваши активные записи\n\
        /admin - все активные записи (только для администратора)\n\n\
        Как записаться:\n\
        1. Нажмите «📝 Записаться»\n\
        2. Выберите тип кузова\n\
        3. Выберите тип мойки\n\
        4. Выберите дату и время\n\
        5. Введите номер телефона в формате +7XXXXXXXXXX\n\
        6. Подтвердите запись\n\n\
        Отменить запись можно в разделе «📋 Мои записи».";
    format!("{}\n\n{}", bold("📖 Инструкция"), escape_markdown_v2(body))
}

fn my_bookings(bookings: &[Booking]) -> Rendered {
    if bookings.is_empty() {
        return Rendered::new(
            escape_markdown_v2("📋 У вас нет активных записей."),
            main_menu_keyboard(),
        );
    }

    let mut text = format!("{}\n\n", bold("📋 Ваши записи:"));
    let mut keyboard = Vec::new();
    for booking in bookings {
        text.push_str(&booking_lines(booking));
        text.push_str(&format!("\n{}\n", escape_markdown_v2(&"─".repeat(20))));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("❌ Отменить запись #{}", booking.id),
            format!("cancel_booking_{}", booking.id),
        )]);
    }
    keyboard.push(vec![InlineKeyboardButton::callback("🏠 Меню", "home")]);

    Rendered::new(text, InlineKeyboardMarkup::new(keyboard))
}

fn all_bookings(bookings: &[OwnedBooking]) -> Rendered {
    if bookings.is_empty() {
        return Rendered {
            text: escape_markdown_v2("📋 На данный момент нет активных записей."),
            keyboard: None,
        };
    }

    let mut text = format!("{}\n\n", bold(&format!("📊 Все активные записи ({}):", bookings.len())));
    for owned in bookings {
        let client = match (&owned.first_name, &owned.username) {
            (Some(name), Some(username)) => format!("{} (@{})", name, username),
            (Some(name), None) => name.clone(),
            (None, Some(username)) => format!("@{}", username),
            (None, None) => "Неизвестно".to_string(),
        };
        text.push_str(&escape_markdown_v2(&format!(
            "👤 Клиент: {} (ID: {})\n",
            client, owned.booking.user_id
        )));
        text.push_str(&booking_lines(&owned.booking));
        text.push_str(&format!("\n{}\n", escape_markdown_v2(&"─".repeat(20))));
    }

    Rendered { text, keyboard: None }
}

/// Превращает ответ диалога в сообщение Telegram.
pub fn render(reply: &Reply) -> Rendered {
    match reply {
        Reply::MainMenu => Rendered::new(
            format!("{}\n\n{}", bold("👋 Главное меню"), escape_markdown_v2("Что вы хотите сделать?")),
            main_menu_keyboard(),
        ),
        Reply::Help => Rendered::new(help_text(), main_menu_keyboard()),
        Reply::Categories { options, notice } => Rendered::new(
            format!(
                "{}{}",
                notice_text(notice.as_ref()),
                escape_markdown_v2("🚗 Выберите тип кузова вашего автомобиля:")
            ),
            options_keyboard(options, "cat_"),
        ),
        Reply::Services { selection, options, notice } => Rendered::new(
            format!(
                "{}{}{}",
                notice_text(notice.as_ref()),
                selection_lines(selection),
                escape_markdown_v2("💧 Выберите тип мойки:")
            ),
            options_keyboard(options, "svc_"),
        ),
        Reply::Dates { selection, dates, notice } => Rendered::new(
            format!(
                "{}{}{}",
                notice_text(notice.as_ref()),
                selection_lines(selection),
                escape_markdown_v2("📅 Выберите дату:")
            ),
            dates_keyboard(dates),
        ),
        Reply::Times { selection, times, notice } => Rendered::new(
            format!(
                "{}{}{}",
                notice_text(notice.as_ref()),
                selection_lines(selection),
                escape_markdown_v2("⏰ Выберите время:")
            ),
            times_keyboard(times),
        ),
        Reply::AskContact { selection, saved_contact, notice } => {
            let mut keyboard = Vec::new();
            if let Some(phone) = saved_contact {
                keyboard.push(vec![InlineKeyboardButton::callback(
                    format!("📞 Использовать {}", phone),
                    "contact_saved",
                )]);
            }
            keyboard.push(back_row());
            Rendered::new(
                format!(
                    "{}{}{}",
                    notice_text(notice.as_ref()),
                    selection_lines(selection),
                    escape_markdown_v2("📞 Введите ваш номер телефона в формате: +7XXXXXXXXXX")
                ),
                InlineKeyboardMarkup::new(keyboard),
            )
        }
        Reply::Confirm(request) => Rendered::new(
            format!(
                "{}\n\n{}\n\n{}",
                bold("✅ Подтвердите вашу запись:"),
                request_lines(request),
                escape_markdown_v2("Все верно?")
            ),
            InlineKeyboardMarkup::new(vec![
                vec![
                    InlineKeyboardButton::callback("✅ Подтвердить", "confirm_yes"),
                    InlineKeyboardButton::callback("❌ Отменить", "confirm_no"),
                ],
                back_row(),
            ]),
        ),
        Reply::Booked(booking) => Rendered::new(
            format!(
                "{}\n\n{}\n\n{}",
                bold("🎉 Спасибо! Ваша запись подтверждена!"),
                booking_lines(booking),
                escape_markdown_v2("Мы ждём вас! 🚗✨")
            ),
            main_menu_keyboard(),
        ),
        Reply::SlotTaken { date, time } => Rendered::new(
            escape_markdown_v2(&format!(
                "❌ Время {} {} уже занято. Пожалуйста, выберите другое время.",
                format_date(*date),
                time
            )),
            InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "📝 Записаться заново",
                "book",
            )]]),
        ),
        Reply::AlreadyBooked { date, time } => Rendered::new(
            escape_markdown_v2(&format!(
                "ℹ️ У вас уже есть запись на {} {}.",
                format_date(*date),
                time
            )),
            main_menu_keyboard(),
        ),
        Reply::NoAvailability => Rendered::new(
            escape_markdown_v2("😞 К сожалению, нет доступных дат для записи."),
            main_menu_keyboard(),
        ),
        Reply::Abandoned => Rendered::new(escape_markdown_v2("❌ Запись отменена."), main_menu_keyboard()),
        Reply::SessionExpired => Rendered::new(
            escape_markdown_v2("⌛ Сессия устарела. Начните запись заново."),
            main_menu_keyboard(),
        ),
        Reply::MyBookings(bookings) => my_bookings(bookings),
        Reply::AllBookings(bookings) => all_bookings(bookings),
        Reply::BookingCancelled(booking) => Rendered::new(
            escape_markdown_v2(&format!("✅ Запись #{} отменена.", booking.id)),
            main_menu_keyboard(),
        ),
        Reply::CancelRejected(CancelFailure::NotFound) => Rendered::new(
            escape_markdown_v2("❌ Запись не найдена или уже неактивна."),
            main_menu_keyboard(),
        ),
        Reply::CancelRejected(CancelFailure::Forbidden) => Rendered::new(
            escape_markdown_v2("❌ Это не ваша запись."),
            main_menu_keyboard(),
        ),
        Reply::AccessDenied => Rendered {
            text: escape_markdown_v2("❌ Доступ запрещён. Эта команда только для администратора."),
            keyboard: None,
        },
    }
}

/// Делит длинный текст по строкам, чтобы не рвать экранирование.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if !current.is_empty() && current.len() + line.len() > limit {
            parts.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
