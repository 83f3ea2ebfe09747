pub mod error;
pub mod robot;
pub mod status;
