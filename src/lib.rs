#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod storage;

pub use crate::core::models::{CostProfile, CryptoParameters, Entry, PasswordAge};
pub use crate::core::password_generator::{generate_password, PasswordConfig};
pub use crate::core::session::Session;
pub use crate::core::vault_service::VaultService;
pub use crate::error::{Result, StrongboxError};
