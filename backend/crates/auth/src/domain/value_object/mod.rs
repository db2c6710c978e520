//! Value Object Module

pub mod email;
pub mod request_context;
