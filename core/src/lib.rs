pub mod auth;
pub mod error;
pub mod intent;
pub mod tool;
