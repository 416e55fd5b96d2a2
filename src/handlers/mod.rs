pub mod appointments;
pub mod directory;
pub mod health;
pub mod notifications;
pub mod settings;
pub mod time_blocks;
