//! Quote pricing and the quote ledger live here.

pub mod entities;
pub mod ledger;
pub mod rate;
pub mod service;

pub use entities::{EquipmentType, LocationSelection, Quote, QuoteRequest};
pub use ledger::{
    clamp_page, paginate, FilterCriteria, LedgerError, LedgerView, Page, QuoteLedger, SharedLedger,
};
pub use rate::{compute_rate, estimate_days, RateBreakdown, RateError};
pub use service::{QuoteError, QuoteResponse, QuoteService};
