// src/handlers/mod.rs

pub mod instructor;
pub mod quiz;
