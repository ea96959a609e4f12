#![forbid(unsafe_code)]

// Modules
pub mod http;
pub mod orm;
pub mod utils;
