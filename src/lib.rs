pub mod config;
pub mod core;
pub mod delivery;
pub mod error;
pub mod exchange;
pub mod models;
pub mod oracle;
pub mod pipeline;
#[cfg(test)]
pub mod test_helpers;
