pub mod persistence;
pub mod version;

/// Round a currency amount to cents for display.
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}
