//! Utilities shared by the Kakehashi broker binary and its tests.

pub mod logger;
pub mod time;
