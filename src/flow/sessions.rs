use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::models::Step;

#[derive(Debug, Clone)]
pub struct Session {
    pub step: Step,
    pub touched_at: Instant,
}

impl Session {
    pub fn new(step: Step) -> Self {
        Self {
            step,
            touched_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() >= ttl
    }
}

/// Ячейка сессии одного пользователя. Мьютекс выстраивает действия
/// одного пользователя в очередь, разные пользователи не мешают друг другу.
pub type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Незавершённые диалоги в памяти. При падении процесса теряются
/// только неподтверждённые выборы.
#[derive(Clone, Debug)]
pub struct SessionStore {
    slots: Arc<RwLock<HashMap<i64, SessionSlot>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn slot(&self, user_id: i64) -> SessionSlot {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(&user_id) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write().await;
        slots.entry(user_id).or_default().clone()
    }

    /// Текущий шаг пользователя, если сессия жива.
    pub async fn current_step(&self, user_id: i64) -> Option<Step> {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(&user_id)?.clone()
        };
        let session = slot.lock().await;
        session
            .as_ref()
            .filter(|s| !s.is_expired(self.ttl))
            .map(|s| s.step.clone())
    }

    /// Удаляет простаивающие и пустые сессии. Ячейки, которые кто-то
    /// держит или уже взял из карты, не трогаем.
    pub async fn cleanup(&self) -> usize {
        let mut slots = self.slots.write().await;
        let previous_count = slots.len();

        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => session.as_ref().is_some_and(|s| !s.is_expired(self.ttl)),
                Err(_) => true,
            }
        });

        let current_count = slots.len();
        log::debug!("🧹 Sessions cleaned: {} -> {} entries", previous_count, current_count);
        previous_count - current_count
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cleanup_drops_expired_and_empty_slots() {
        let store = SessionStore::new(Duration::from_millis(300));

        *store.slot(1).await.lock().await = Some(Session::new(Step::ChoosingCategory));
        let _ = store.slot(2).await;
        assert_eq!(store.len().await, 2);

        assert_eq!(store.cleanup().await, 1);
        assert_eq!(store.current_step(1).await, Some(Step::ChoosingCategory));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.current_step(1).await, None);
        assert_eq!(store.cleanup().await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn slot_taken_before_lock_survives_cleanup() {
        let store = SessionStore::new(Duration::from_secs(60));

        let slot = store.slot(1).await;
        assert_eq!(store.cleanup().await, 0);

        *slot.lock().await = Some(Session::new(Step::ChoosingCategory));
        drop(slot);
        assert_eq!(store.current_step(1).await, Some(Step::ChoosingCategory));
    }

    #[tokio::test]
    async fn busy_slots_survive_cleanup() {
        let store = SessionStore::new(Duration::from_millis(1));
        let slot = store.slot(7).await;
        let _guard = slot.lock().await;

        assert_eq!(store.cleanup().await, 0);
        assert_eq!(store.len().await, 1);
    }
}
