/// Входящее действие пользователя, уже отвязанное от транспорта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Home,
    Back,
    Help,
    PickCategory(String),
    PickService(String),
    PickDate(String),
    PickTime(String),
    TextInput(String),
    UseSavedContact,
    Confirm(bool),
    CancelBooking(i64),
    ListMyBookings,
    AdminListAll,
}

impl Action {
    /// Разбор данных inline-кнопки. Неизвестные данные игнорируются.
    pub fn from_callback(data: &str) -> Option<Self> {
        let action = match data {
            "book" => Action::Start,
            "home" => Action::Home,
            "back" => Action::Back,
            "help" => Action::Help,
            "my_bookings" => Action::ListMyBookings,
            "contact_saved" => Action::UseSavedContact,
            "confirm_yes" => Action::Confirm(true),
            "confirm_no" => Action::Confirm(false),
            data => {
                if let Some(id) = data.strip_prefix("cancel_booking_") {
                    Action::CancelBooking(id.parse().ok()?)
                } else if let Some(key) = data.strip_prefix("cat_") {
                    Action::PickCategory(key.to_string())
                } else if let Some(key) = data.strip_prefix("svc_") {
                    Action::PickService(key.to_string())
                } else if let Some(date) = data.strip_prefix("date_") {
                    Action::PickDate(date.to_string())
                } else if let Some(time) = data.strip_prefix("time_") {
                    Action::PickTime(time.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }

    /// Действия вне конвейера выбора не трогают текущую сессию.
    pub fn keeps_session(&self) -> bool {
        matches!(
            self,
            Action::Help | Action::CancelBooking(_) | Action::ListMyBookings | Action::AdminListAll
        )
    }
}
