#![forbid(unsafe_code)]

pub mod feedback;
pub mod ledger;
