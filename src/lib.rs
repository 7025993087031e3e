//! Running and cycling workout log: typed workouts with cached pace or speed,
//! an ordered in-memory log, and whole-log persistence to a key-value store.

pub mod cli;
pub mod position;
pub mod render;
pub mod session;
pub mod store;
pub mod utils;
pub mod workout;
pub mod workout_log;
