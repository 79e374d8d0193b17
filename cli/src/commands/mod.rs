pub mod intent;
pub mod tools;
pub mod workflow;
