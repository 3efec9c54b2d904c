pub mod error_chain;
pub mod logger;
pub mod more_errors;
