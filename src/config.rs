//! Настройки процесса. Читаются из окружения (и `.env`) один раз при старте.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;

use crate::error::ConfigError;
use crate::models::{Catalog, ScheduleTemplate};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub admin_user_id: Option<i64>,
    pub open_hour: u32,
    pub close_hour: u32,
    /// Интервал между слотами в минутах; в окружении задаётся в часах, можно дробно.
    pub slot_interval_minutes: u32,
    pub blackout_weekday: Weekday,
    pub slot_capacity: u32,
    pub days_ahead: u32,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub catalog: Catalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://carwash_bot.db".to_string(),
            database_max_connections: 5,
            admin_user_id: None,
            open_hour: 9,
            close_hour: 19,
            slot_interval_minutes: 90,
            blackout_weekday: Weekday::Mon,
            slot_capacity: 2,
            days_ahead: 7,
            session_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            catalog: Catalog::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Сборка из произвольного источника ключей; пустые значения считаются отсутствующими.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let interval_hours: f64 = parse_or(&get, "SLOT_INTERVAL_HOURS", 1.5)?;
        if !interval_hours.is_finite() || interval_hours <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "SLOT_INTERVAL_HOURS",
                value: interval_hours.to_string(),
            });
        }

        let blackout_weekday = match get("BLACKOUT_WEEKDAY") {
            Some(raw) => Weekday::from_str(raw.trim()).map_err(|_| ConfigError::InvalidValue {
                key: "BLACKOUT_WEEKDAY",
                value: raw,
            })?,
            None => defaults.blackout_weekday,
        };

        let config = Config {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            admin_user_id: parse_opt(&get, "ADMIN_USER_ID")?.filter(|id| *id != 0),
            open_hour: parse_or(&get, "OPEN_HOUR", defaults.open_hour)?,
            close_hour: parse_or(&get, "CLOSE_HOUR", defaults.close_hour)?,
            slot_interval_minutes: (interval_hours * 60.0).round() as u32,
            blackout_weekday,
            slot_capacity: parse_or(&get, "SLOT_CAPACITY", defaults.slot_capacity)?,
            days_ahead: parse_or(&get, "DAYS_AHEAD", defaults.days_ahead)?,
            session_ttl: Duration::from_secs(60 * parse_or(&get, "SESSION_TTL_MINUTES", 30u64)?),
            sweep_interval: Duration::from_secs(parse_or(&get, "SWEEP_INTERVAL_SECS", 300u64)?),
            catalog: defaults.catalog,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.open_hour >= self.close_hour {
            return Err(ConfigError::Inconsistent(format!(
                "open hour {} must be before close hour {}",
                self.open_hour, self.close_hour
            )));
        }
        if self.close_hour > 24 {
            return Err(ConfigError::Inconsistent(format!(
                "close hour {} is past midnight",
                self.close_hour
            )));
        }
        if self.slot_interval_minutes == 0 {
            return Err(ConfigError::Inconsistent("slot interval must be positive".into()));
        }
        let working_minutes = (self.close_hour - self.open_hour) * 60;
        if self.slot_interval_minutes > working_minutes {
            return Err(ConfigError::Inconsistent(format!(
                "slot interval {} min is longer than the working day ({} min)",
                self.slot_interval_minutes, working_minutes
            )));
        }
        if self.slot_capacity == 0 {
            return Err(ConfigError::Inconsistent("slot capacity must be at least 1".into()));
        }
        if self.days_ahead == 0 {
            return Err(ConfigError::Inconsistent("booking window must be at least 1 day".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Inconsistent("sweep interval must be positive".into()));
        }
        if self.catalog.categories.is_empty() || self.catalog.services.is_empty() {
            return Err(ConfigError::Inconsistent("catalog must not be empty".into()));
        }
        Ok(())
    }

    pub fn schedule(&self) -> ScheduleTemplate {
        ScheduleTemplate {
            open_hour: self.open_hour,
            close_hour: self.close_hour,
            interval_minutes: self.slot_interval_minutes,
            blackout: self.blackout_weekday,
        }
    }

}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw.clone() })
        })
        .transpose()
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_deployment() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.open_hour, 9);
        assert_eq!(config.close_hour, 19);
        assert_eq!(config.slot_interval_minutes, 90);
        assert_eq!(config.blackout_weekday, Weekday::Mon);
        assert_eq!(config.slot_capacity, 2);
        assert_eq!(config.days_ahead, 7);
        assert_eq!(config.admin_user_id, None);
    }

    #[test]
    fn reads_overrides() {
        let config = from_pairs(&[
            ("SLOT_INTERVAL_HOURS", "0.75"),
            ("BLACKOUT_WEEKDAY", "sun"),
            ("SLOT_CAPACITY", "3"),
            ("ADMIN_USER_ID", "12345"),
        ])
        .unwrap();
        assert_eq!(config.slot_interval_minutes, 45);
        assert_eq!(config.blackout_weekday, Weekday::Sun);
        assert_eq!(config.slot_capacity, 3);
        assert_eq!(config.admin_user_id, Some(12345));
    }

    #[test]
    fn zero_admin_means_unset() {
        let config = from_pairs(&[("ADMIN_USER_ID", "0")]).unwrap();
        assert_eq!(config.admin_user_id, None);
    }

    #[test]
    fn rejects_inconsistent_schedule() {
        assert!(matches!(
            from_pairs(&[("OPEN_HOUR", "19"), ("CLOSE_HOUR", "9")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(from_pairs(&[("SLOT_CAPACITY", "0")]).is_err());
        assert!(from_pairs(&[("DAYS_AHEAD", "0")]).is_err());
        assert!(from_pairs(&[("SLOT_INTERVAL_HOURS", "-1")]).is_err());
        assert!(from_pairs(&[("CLOSE_HOUR", "25")]).is_err());
    }

    #[test]
    fn rejects_interval_longer_than_working_day() {
        assert!(matches!(
            from_pairs(&[("SLOT_INTERVAL_HOURS", "1e9")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            from_pairs(&[("OPEN_HOUR", "9"), ("CLOSE_HOUR", "12"), ("SLOT_INTERVAL_HOURS", "3.5")]),
            Err(ConfigError::Inconsistent(_))
        ));
        let config = from_pairs(&[("OPEN_HOUR", "9"), ("CLOSE_HOUR", "12"), ("SLOT_INTERVAL_HOURS", "3")]).unwrap();
        assert_eq!(config.slot_interval_minutes, 180);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            from_pairs(&[("SLOT_CAPACITY", "two")]),
            Err(ConfigError::InvalidValue { key: "SLOT_CAPACITY", .. })
        ));
        assert!(from_pairs(&[("BLACKOUT_WEEKDAY", "someday")]).is_err());
    }
}
