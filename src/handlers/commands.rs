use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot_state::BotState;
use crate::flow::Action;
use crate::handlers::{send_failure, send_reply, user_ref, HandlerResult};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать помощь")]
    Help,
    #[command(description = "мои записи")]
    MyBookings,
    #[command(description = "все записи (для администратора)")]
    Admin,
}

impl Command {
    pub fn action(&self) -> Action {
        match self {
            Command::Start => Action::Start,
            Command::Help => Action::Help,
            Command::MyBookings => Action::ListMyBookings,
            Command::Admin => Action::AdminListAll,
        }
    }
}

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, state: BotState) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user = user_ref(from);
    log::info!("📨 Command {:?} from user {}", cmd, user.id);

    match state.dispatch(&user, cmd.action()).await {
        Ok(reply) => send_reply(&bot, msg.chat.id, &reply).await,
        Err(e) => {
            log::error!("❌ Error handling command for user {}: {}", user.id, e);
            send_failure(&bot, msg.chat.id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_commands() {
        assert_eq!(Command::parse("/start", "carwash_bot").ok(), Some(Command::Start));
        assert_eq!(Command::parse("/mybookings", "carwash_bot").ok(), Some(Command::MyBookings));
        assert_eq!(Command::parse("/admin", "carwash_bot").ok(), Some(Command::Admin));
        assert!(Command::parse("/unknown", "carwash_bot").is_err());
    }
}
