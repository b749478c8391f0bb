#![forbid(unsafe_code)]

pub mod identity;
pub mod moderation;
pub mod platform;
pub mod query;
pub mod summary;
