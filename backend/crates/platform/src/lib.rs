//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Secret hashing (Argon2id with salt and pepper)
//! - Signed bearer tokens (HMAC JWT)
//! - Client header parsing (bearer token, device id)
//! - Deadlines for store operations

pub mod client;
pub mod crypto;
pub mod deadline;
pub mod password;
pub mod token;
