use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::flow::Action;
use crate::handlers::{edit_reply, send_failure, send_reply, user_ref, HandlerResult};

pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    // Отвечаем сразу, чтобы у кнопки пропали часики
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("⚠️ Could not answer callback query: {}", e);
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = Action::from_callback(data) else {
        log::warn!("⚠️ Unknown callback data: {}", data);
        return Ok(());
    };

    let user = user_ref(&q.from);
    log::debug!("🔘 Callback {} from user {}", data, user.id);

    let reply = match state.dispatch(&user, action).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("❌ Error handling callback {} for user {}: {}", data, user.id, e);
            let chat_id = q
                .message
                .as_ref()
                .map(|message| message.chat().id)
                .unwrap_or(ChatId(user.id));
            return send_failure(&bot, chat_id).await;
        }
    };

    match q.message {
        Some(ref message) => edit_reply(&bot, message.chat().id, message.id(), &reply).await,
        None => send_reply(&bot, ChatId(user.id), &reply).await,
    }
}
