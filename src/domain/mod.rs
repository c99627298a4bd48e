pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
