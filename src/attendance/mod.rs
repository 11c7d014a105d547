//! Attendance core: clock policy, the check-in/check-out rules, and the store
//! they are persisted through.

pub mod policy;
pub mod rules;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod memory;
