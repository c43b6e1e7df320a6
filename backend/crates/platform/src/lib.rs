//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the framework:
//! - Cryptographic utilities (random tokens, HMAC signing, constant-time compare)
//! - Password hashing (Argon2id)
//! - Cookie parsing and `Set-Cookie` building

pub mod cookie;
pub mod crypto;
pub mod password;
