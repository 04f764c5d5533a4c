//! Attendance domain services. Each takes its collaborators through `new`
//! so tests can swap the store and the clock.

pub mod clock;
pub mod directory;
pub mod engine;
pub mod policy;
pub mod report;
pub mod users;

#[cfg(test)]
pub mod testing;
