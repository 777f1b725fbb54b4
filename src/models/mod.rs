pub mod booking;
pub mod catalog;
pub mod session;
pub mod time_slot;
pub mod user;

pub use booking::{Booking, BookingRequest, BookingStatus, OwnedBooking};
pub use catalog::{Catalog, CatalogItem};
pub use session::{Selection, Step};
pub use time_slot::{ScheduleTemplate, SlotTime};
pub use user::{User, UserRef};
