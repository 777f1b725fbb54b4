use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::handlers::utils::{escape_markdown_v2, format_date};
use crate::models::{Booking, SlotTime, UserRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingNotice {
    pub user_id: i64,
    pub user_name: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub service: String,
    pub contact: String,
}

impl BookingNotice {
    pub fn new(user: &UserRef, booking: &Booking) -> Self {
        Self {
            user_id: user.id,
            user_name: user.first_name.clone(),
            date: booking.date,
            time: booking.time,
            service: booking.service.clone(),
            contact: booking.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    BookingCreated(BookingNotice),
    BookingCancelled(BookingNotice),
}

/// Получатель событий о бронях. Ошибки доставки остаются внутри
/// реализации и не откатывают запись или отмену.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: BookingEvent);
}

/// Уведомления администратору в Telegram.
pub struct TelegramNotifier {
    bot: Bot,
    admin_chat: Option<ChatId>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, admin_user_id: Option<i64>) -> Self {
        Self {
            bot,
            admin_chat: admin_user_id.map(ChatId),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: BookingEvent) {
        let Some(chat_id) = self.admin_chat else {
            log::warn!("ADMIN_USER_ID is not set, notification dropped: {:?}", event);
            return;
        };

        let text = format_admin_notice(&event);
        match self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            Ok(_) => log::info!("📨 Admin notified: {}", event_name(&event)),
            Err(e) => log::error!("❌ Failed to notify admin about {}: {}", event_name(&event), e),
        }
    }
}

/// Пишет события в лог в виде JSON, если администратор не задан.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: BookingEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("📢 {}", json),
            Err(e) => log::error!("Failed to serialize event {:?}: {}", event, e),
        }
    }
}

fn event_name(event: &BookingEvent) -> &'static str {
    match event {
        BookingEvent::BookingCreated(_) => "booking_created",
        BookingEvent::BookingCancelled(_) => "booking_cancelled",
    }
}

pub fn format_admin_notice(event: &BookingEvent) -> String {
    let (title, notice) = match event {
        BookingEvent::BookingCreated(n) => ("📢 *Новая запись\\!*", n),
        BookingEvent::BookingCancelled(n) => ("❌ *Отмена записи\\!*", n),
    };

    format!(
        "{}\n\n\
        👤 *Клиент:* {}\n\
        🆔 *ID:* {}\n\
        📞 *Телефон:* {}\n\
        🚗 *Услуга:* {}\n\
        📅 *Дата:* {}\n\
        ⏰ *Время:* {}",
        title,
        escape_markdown_v2(&notice.user_name),
        notice.user_id,
        escape_markdown_v2(&notice.contact),
        escape_markdown_v2(&notice.service),
        escape_markdown_v2(&format_date(notice.date)),
        escape_markdown_v2(&notice.time.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> BookingNotice {
        BookingNotice {
            user_id: 42,
            user_name: "Anna".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            time: "10:00".parse().unwrap(),
            service: "Седан - Однофазная мойка".to_string(),
            contact: "+79991234567".to_string(),
        }
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(BookingEvent::BookingCreated(notice())).unwrap();
        assert_eq!(json["event"], "booking_created");
        assert_eq!(json["time"], "10:00");
        assert_eq!(json["date"], "2024-01-02");
    }

    #[test]
    fn admin_notice_escapes_markdown() {
        let text = format_admin_notice(&BookingEvent::BookingCancelled(notice()));
        assert!(text.contains("\\+79991234567"));
        assert!(text.contains("Седан \\- Однофазная мойка"));
        assert!(text.contains("Вт, 02\\.01\\.2024"));
    }
}
