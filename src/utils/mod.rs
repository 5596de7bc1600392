pub mod config;
pub mod open_plan;
