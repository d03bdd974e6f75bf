// src/models/mod.rs

pub mod quiz_attempt;
pub mod response;
pub mod stats;
