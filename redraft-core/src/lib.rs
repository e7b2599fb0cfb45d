pub mod backup;
pub mod config;
pub mod confirm;
pub mod diff;
pub mod fsio;
pub mod metadata;
pub mod prompting;
pub mod service;
pub mod transaction;
