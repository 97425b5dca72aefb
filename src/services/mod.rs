pub mod activity;
pub mod auth;
pub mod brands;
pub mod categories;
pub mod devices;
pub mod users;
