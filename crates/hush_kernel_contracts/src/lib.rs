#![forbid(unsafe_code)]

pub mod access;
pub mod common;
pub mod feedback;
pub mod filter;
pub mod moderation;
pub mod summary;

pub use common::{ContractViolation, UnixTimeNs, Validate};
