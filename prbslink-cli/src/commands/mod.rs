pub mod check;
pub mod config;
pub mod generate;
pub mod soak;
