//! Entity Module

pub mod account;
pub mod permanent_session;
