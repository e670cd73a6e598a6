pub const APP_NAME: &str = "Freight Quote";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with distance lookups.
pub fn user_agent() -> String {
    format!("freight-quote/{APP_VERSION}")
}
