pub mod health;
pub mod reset;
pub mod upload;
