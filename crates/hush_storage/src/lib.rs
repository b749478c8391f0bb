#![forbid(unsafe_code)]

pub mod feedback;
pub mod repo;
