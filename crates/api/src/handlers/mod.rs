pub mod executions;
pub mod health;
pub mod status;
