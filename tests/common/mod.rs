#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqliteConnectOptions;
use tempfile::TempDir;

use carwash_bot::config::Config;
use carwash_bot::database::Database;
use carwash_bot::flow::SelectionFlow;
use carwash_bot::models::{BookingRequest, Catalog, SlotTime, User, UserRef};
use carwash_bot::notifier::{BookingEvent, Notifier};

pub const ADMIN_ID: i64 = 1000;

/// База в отдельном временном каталоге; живёт, пока жив `TestDb`.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("bookings.db"))
        .create_if_missing(true);
    let db = Database::connect(options, 8).await.unwrap();
    db.init().await.unwrap();
    TestDb { db, _dir: dir }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: BookingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn test_config() -> Config {
    Config {
        admin_user_id: Some(ADMIN_ID),
        ..Config::default()
    }
}

pub fn flow_with(db: &Database, config: &Config) -> (SelectionFlow, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let flow = SelectionFlow::new(config, db.clone(), notifier.clone());
    (flow, notifier)
}

pub fn user(id: i64) -> UserRef {
    UserRef {
        id,
        first_name: format!("User{id}"),
        username: Some(format!("user{id}")),
    }
}

pub async fn register(db: &Database, id: i64) -> UserRef {
    let user = user(id);
    User::upsert(db, &user).await.unwrap();
    user
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

pub fn slot(label: &str) -> SlotTime {
    label.parse().unwrap()
}

pub fn request(user_id: i64, date: NaiveDate, time: &str) -> BookingRequest {
    let catalog = Catalog::default();
    BookingRequest {
        user_id,
        category: catalog.category("sedan").unwrap().clone(),
        service: catalog.service("single").unwrap().clone(),
        date,
        time: slot(time),
        phone: "+79991234567".to_string(),
    }
}
