// src/services/mod.rs

pub mod quiz_attempts;
