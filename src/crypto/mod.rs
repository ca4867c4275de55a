pub mod kdf;
pub mod master;
pub mod stream;
