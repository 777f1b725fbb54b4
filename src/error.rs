use thiserror::Error;

/// Ошибки хранилища. Бизнес-исходы (слот занят, бронь не найдена)
/// сюда не попадают, они возвращаются значениями.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt booking row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("inconsistent schedule: {0}")]
    Inconsistent(String),
}

/// Ошибки ввода, которые исправляются повторным запросом на том же шаге.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("contact must look like +7XXXXXXXXXX")]
    InvalidContact,

    #[error("malformed date: {0:?}")]
    MalformedDate(String),

    #[error("malformed time: {0:?}")]
    MalformedTime(String),

    #[error("date is outside the booking window")]
    DateOutOfWindow,

    #[error("time is no longer available")]
    TimeUnavailable,

    #[error("unknown option: {0:?}")]
    UnknownOption(String),

    #[error("action does not match the current step")]
    UnexpectedAction,

    #[error("no saved contact")]
    NoSavedContact,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
