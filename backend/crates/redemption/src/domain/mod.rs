//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (QrAction, QrCode, UserQrScan)
//! - Domain value objects (ActionPayload, UsagePolicy, CounterUpdate)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod value_objects;
