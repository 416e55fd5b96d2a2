pub mod booking;
pub mod business_hours;
pub mod notification;
pub mod service;
pub mod time_block;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use business_hours::{DayAvailability, SpecialDay, WeekdayHours};
pub use notification::{
    Channel, NotificationCategory, NotificationMessage, NotificationPreference, NotificationStatus,
};
pub use service::Service;
pub use time_block::TimeBlock;
pub use user::User;
