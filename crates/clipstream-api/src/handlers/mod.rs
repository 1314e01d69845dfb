pub mod health;
pub mod queue_admin;
pub mod upload_complete;
pub mod upload_start;
