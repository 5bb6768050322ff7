//! Route handlers organized by resource

pub mod health;
pub mod hello;
pub mod query;
pub mod tables;
