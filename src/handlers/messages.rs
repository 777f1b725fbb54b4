use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::flow::Action;
use crate::handlers::{send_failure, send_reply, user_ref, HandlerResult};

pub async fn message_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // Неизвестные команды не считаем вводом
    if text.starts_with('/') {
        return Ok(());
    }
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user = user_ref(from);

    match state.dispatch(&user, Action::TextInput(text.to_string())).await {
        Ok(reply) => send_reply(&bot, msg.chat.id, &reply).await,
        Err(e) => {
            log::error!("❌ Error handling message from user {}: {}", user.id, e);
            send_failure(&bot, msg.chat.id).await
        }
    }
}
