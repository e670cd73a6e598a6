use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{EquipmentType, FilterCriteria, RateError};

#[derive(Parser, Debug)]
#[command(name = "freight-quote", version, about = "Freight rate quotes with a local ledger")]
pub struct Cli {
    /// Configuration file path (defaults to ./freight-quote.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the directory holding the ledger and distance cache
    #[arg(long, global = true, env = "FREIGHT_QUOTE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Price a shipment and record it in the ledger
    Quote(QuoteArgs),

    /// Show one page of the ledger
    List(ViewArgs),

    /// Delete a row of the displayed ledger page
    Delete {
        /// Row number on the displayed page (1-based)
        row: usize,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Manage cached distances
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommands {
    /// Forget the cached distance between two locations
    Clear { origin: String, destination: String },
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    #[arg(long)]
    pub origin: String,

    #[arg(long)]
    pub destination: String,

    /// dry_van, reefer or flatbed
    #[arg(long)]
    pub equipment: String,

    /// Shipment weight in pounds
    #[arg(long)]
    pub weight: f64,

    /// Pickup date (YYYY-MM-DD)
    #[arg(long)]
    pub pickup_date: String,

    /// Known distance in kilometers; skips the distance lookup
    #[arg(long)]
    pub cache_distance: Option<f64>,

    /// Print the JSON response instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Only quotes whose origin contains this text
    #[arg(long, default_value = "")]
    pub origin: String,

    /// Only quotes whose destination contains this text
    #[arg(long, default_value = "")]
    pub destination: String,

    /// Only quotes for this equipment (dry_van, reefer, flatbed, any)
    #[arg(long, default_value = "any")]
    pub equipment: String,

    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to ledger.page_size)
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl ViewArgs {
    pub fn criteria(&self) -> Result<FilterCriteria, RateError> {
        let equipment = match self.equipment.trim() {
            "" | "any" => None,
            other => Some(other.parse::<EquipmentType>()?),
        };
        Ok(FilterCriteria {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            equipment,
        })
    }
}
