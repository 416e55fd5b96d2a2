pub mod business_calendar;
pub mod notifications;
pub mod scheduling;
