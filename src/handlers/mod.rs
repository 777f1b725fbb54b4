pub mod callbacks;
pub mod commands;
pub mod messages;
pub mod utils;

pub use callbacks::callback_handler;
pub use commands::{command_handler, Command};
pub use messages::message_handler;

use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use tokio::time;

use crate::bot_state::BotState;
use crate::flow::Reply;
use crate::handlers::utils::{escape_markdown_v2, render, split_message, MESSAGE_LIMIT};
use crate::models::UserRef;

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

pub fn user_ref(user: &teloxide::types::User) -> UserRef {
    UserRef {
        id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

/// Новое сообщение с ответом. Длинные списки уходят несколькими частями,
/// клавиатура прикрепляется к последней.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> HandlerResult {
    let rendered = render(reply);
    let mut parts = split_message(&rendered.text, MESSAGE_LIMIT);
    let last = parts.pop().unwrap_or_default();

    for part in parts {
        bot.send_message(chat_id, part)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
    }

    let mut request = bot.send_message(chat_id, last).parse_mode(ParseMode::MarkdownV2);
    if let Some(keyboard) = rendered.keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await?;

    Ok(())
}

/// Обновляет сообщение с кнопками. Если Telegram отказал, шлём новое.
pub async fn edit_reply(bot: &Bot, chat_id: ChatId, message_id: MessageId, reply: &Reply) -> HandlerResult {
    let rendered = render(reply);
    if rendered.text.len() > MESSAGE_LIMIT {
        return send_reply(bot, chat_id, reply).await;
    }

    let mut request = bot
        .edit_message_text(chat_id, message_id, rendered.text)
        .parse_mode(ParseMode::MarkdownV2);
    if let Some(keyboard) = rendered.keyboard {
        request = request.reply_markup(keyboard);
    }

    if let Err(e) = request.await {
        log::warn!("⚠️ Could not edit message {} in chat {}: {}", message_id.0, chat_id, e);
        send_reply(bot, chat_id, reply).await?;
    }

    Ok(())
}

pub async fn send_failure(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(
        chat_id,
        escape_markdown_v2("⚠️ Произошла ошибка. Пожалуйста, попробуйте позже."),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;
    Ok(())
}

/// Переводит прошедшие записи в завершённые.
pub async fn expire_bookings_task(state: BotState) {
    let mut interval = time::interval(state.config.sweep_interval);

    loop {
        interval.tick().await;
        state.expire_past_bookings().await;
    }
}

/// Убирает брошенные диалоги.
pub async fn cleanup_sessions_task(state: BotState) {
    let mut interval = time::interval(time::Duration::from_secs(60));

    loop {
        interval.tick().await;
        state.cleanup_sessions().await;
    }
}
