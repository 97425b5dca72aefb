pub mod activity_logs;
pub mod base;
pub mod brands;
pub mod categories;
pub mod devices;
pub mod sessions;
pub mod technical_info;
pub mod users;
