use std::sync::Arc;

use chrono::Local;

use crate::config::Config;
use crate::database::Database;
use crate::error::FlowError;
use crate::flow::{Action, Reply, SelectionFlow};
use crate::models::UserRef;
use crate::notifier::Notifier;

/// Общее состояние бота, которое dptree передаёт в обработчики.
#[derive(Clone)]
pub struct BotState {
    pub config: Arc<Config>,
    pub flow: SelectionFlow,
}

impl BotState {
    pub fn new(db: Database, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let flow = SelectionFlow::new(&config, db, notifier);
        Self {
            config: Arc::new(config),
            flow,
        }
    }

    /// Действие пользователя в текущем локальном времени.
    pub async fn dispatch(&self, user: &UserRef, action: Action) -> Result<Reply, FlowError> {
        let now = Local::now().naive_local();
        self.flow.handle(user, action, now).await
    }

    pub async fn expire_past_bookings(&self) {
        let now = Local::now().naive_local();
        match self.flow.ledger().expire_stale_past_bookings(now).await {
            Ok(0) => log::debug!("⏱️ No past bookings to complete"),
            Ok(count) => log::info!("⏱️ {} past bookings marked completed", count),
            Err(e) => log::error!("❌ Error completing past bookings: {}", e),
        }
    }

    pub async fn cleanup_sessions(&self) {
        let removed = self.flow.sessions().cleanup().await;
        if removed > 0 {
            log::info!("🧹 {} idle sessions dropped", removed);
        }
    }
}
