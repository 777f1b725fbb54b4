use std::sync::Arc;

use teloxide::prelude::*;

use carwash_bot::bot_state::BotState;
use carwash_bot::config::Config;
use carwash_bot::database::Database;
use carwash_bot::handlers::{self, callback_handler, command_handler, message_handler, Command};
use carwash_bot::notifier::{LogNotifier, Notifier, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting car wash booking bot with SQLite...");

    let config = Config::from_env()?;
    log::info!(
        "⚙️ Schedule {}:00-{}:00 every {} min, {} places per slot, {} days ahead",
        config.open_hour,
        config.close_hour,
        config.slot_interval_minutes,
        config.slot_capacity,
        config.days_ahead
    );

    // Инициализация базы данных
    let db = Database::new(&config.database_url, config.database_max_connections).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let bot = Bot::from_env();
    let notifier: Arc<dyn Notifier> = match config.admin_user_id {
        Some(admin) => Arc::new(TelegramNotifier::new(bot.clone(), Some(admin))),
        None => {
            log::warn!("⚠️ ADMIN_USER_ID is not set, booking events go to the log only");
            Arc::new(LogNotifier)
        }
    };
    let state = BotState::new(db, config, notifier);

    // Фоновая задача для завершения прошедших записей
    let state_clone = state.clone();
    tokio::spawn(async move {
        handlers::expire_bookings_task(state_clone).await;
    });

    // Фоновая задача для очистки сессий
    let state_clone = state.clone();
    tokio::spawn(async move {
        handlers::cleanup_sessions_task(state_clone).await;
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
