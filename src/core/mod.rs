pub mod models;
pub mod password_generator;
pub mod session;
pub mod vault_service;
