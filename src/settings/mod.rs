// Settings: session configuration and JSON persistence.

pub mod store;
pub mod types;
