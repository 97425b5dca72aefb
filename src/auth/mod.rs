pub mod extractor;
pub mod password;
pub mod role;
pub mod session;
