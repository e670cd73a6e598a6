use std::{fmt::Write as _, sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use crate::{
    cli::{CacheCommands, Commands, QuoteArgs, ViewArgs},
    config::Settings,
    domain::{
        entities::iso_date, EquipmentType, QuoteError, QuoteLedger, QuoteRequest, QuoteResponse,
        QuoteService,
    },
    infra::{DistanceCache, DistanceLookup, DistanceMatrixClient, DistanceResolver},
    util::{
        format_currency,
        persistence::{FileStore, KeyValueStore},
    },
};

/// Text to print and whether the command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub failed: bool,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            failed: false,
        }
    }

    fn failed(text: String) -> Self {
        Self { text, failed: true }
    }
}

/// Ledger, distance cache and quote service sharing one store.
pub struct App<L, S> {
    service: QuoteService<L, Arc<S>>,
    ledger: QuoteLedger<Arc<S>>,
    page_size: usize,
}

impl App<DistanceMatrixClient, FileStore> {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = match &settings.storage.data_dir {
            Some(dir) => FileStore::open_in(dir),
            None => FileStore::open_default(),
        }
        .context("failed to open quote store")?;
        info!(path = %store.path().display(), "using store");

        let client = DistanceMatrixClient::with_base_url(
            &settings.distance.base_url,
            settings.distance.api_key.clone(),
            Duration::from_secs(settings.distance.timeout_secs),
        )?;

        Self::new(client, Arc::new(store), settings.ledger.page_size)
    }
}

impl<L: DistanceLookup, S: KeyValueStore> App<L, S> {
    pub fn new(lookup: L, store: Arc<S>, page_size: usize) -> anyhow::Result<Self> {
        let ledger = QuoteLedger::load(store.clone()).context("failed to load quote ledger")?;
        let resolver = DistanceResolver::new(lookup, DistanceCache::new(store));
        Ok(Self {
            service: QuoteService::new(resolver),
            ledger,
            page_size: page_size.max(1),
        })
    }

    pub fn ledger(&self) -> &QuoteLedger<Arc<S>> {
        &self.ledger
    }

    pub async fn run(&mut self, command: Commands) -> anyhow::Result<CommandOutput> {
        match command {
            Commands::Quote(args) => Ok(self.quote(&args).await),
            Commands::List(view) => self.list(&view).map(CommandOutput::ok),
            Commands::Delete { row, view } => self.delete(row, &view),
            Commands::Cache {
                action: CacheCommands::Clear {
                    origin,
                    destination,
                },
            } => {
                self.service
                    .resolver()
                    .cache()
                    .remove(&origin, &destination)
                    .context("failed to clear cached distance")?;
                Ok(CommandOutput::ok(format!(
                    "Cleared cached distance {origin} <-> {destination}"
                )))
            }
        }
    }

    pub async fn quote(&mut self, args: &QuoteArgs) -> CommandOutput {
        let request = QuoteRequest {
            origin: Some(args.origin.clone()),
            destination: Some(args.destination.clone()),
            equipment_type: Some(args.equipment.clone()),
            weight: Some(args.weight),
            pickup_date: Some(args.pickup_date.clone()),
            cache_distance: args.cache_distance,
        };
        let result = self
            .service
            .create_and_record(&mut self.ledger, &request, None)
            .await;
        let failed = result.is_err();

        let text = if args.json {
            let response = QuoteResponse::from(result);
            serde_json::to_string_pretty(&response)
                .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        } else {
            match result {
                Ok(quote) => render_quote(&quote),
                Err(err) => describe_error(&err),
            }
        };

        if failed {
            CommandOutput::failed(text)
        } else {
            CommandOutput::ok(text)
        }
    }

    pub fn list(&self, args: &ViewArgs) -> anyhow::Result<String> {
        let criteria = args.criteria()?;
        let page_size = args.page_size.unwrap_or(self.page_size);
        let view = self.ledger.view(&criteria, page_size, args.page);

        let mut out = String::new();
        if view.matched == 0 {
            out.push_str("No quotes found.");
            return Ok(out);
        }
        let _ = writeln!(
            out,
            "Page {} of {} ({} matching quotes)",
            view.page, view.total_pages, view.matched
        );
        for (row, &index) in view.positions().iter().enumerate() {
            let quote = &self.ledger.quotes()[index];
            let _ = writeln!(
                out,
                "{:>3}. {}  {} -> {}  {}  {:.0} lb  {:.1} km  {}d  {}",
                row + 1,
                iso_date::format(&quote.pickup_date),
                quote.origin,
                quote.destination,
                quote.equipment_type.label(),
                quote.weight,
                quote.distance,
                quote.days,
                format_currency(quote.total),
            );
        }
        Ok(out.trim_end().to_string())
    }

    pub fn delete(&mut self, row: usize, args: &ViewArgs) -> anyhow::Result<CommandOutput> {
        let criteria = args.criteria()?;
        let page_size = args.page_size.unwrap_or(self.page_size);
        let view = self.ledger.view(&criteria, page_size, args.page);

        let Some(view_index) = row.checked_sub(1) else {
            return Ok(CommandOutput::failed("Rows are numbered from 1".into()));
        };
        match self.ledger.delete_in_view(&view, view_index)? {
            Some((removed, page)) => {
                let mut text = format!(
                    "Deleted {} -> {} ({}, pickup {})",
                    removed.origin,
                    removed.destination,
                    removed.equipment_type.label(),
                    iso_date::format(&removed.pickup_date),
                );
                if page != args.page {
                    let _ = write!(text, "\nPage {} no longer exists; showing page {page}", args.page);
                }
                let listing = self.list(&ViewArgs {
                    page,
                    page_size: Some(page_size),
                    ..args.clone()
                })?;
                let _ = write!(text, "\n{listing}");
                Ok(CommandOutput::ok(text))
            }
            None => Ok(CommandOutput::failed(format!(
                "Row {row} is not on page {} ({} rows shown)",
                args.page,
                view.len()
            ))),
        }
    }
}

fn render_quote(quote: &crate::domain::Quote) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} -> {}", quote.origin, quote.destination);
    let _ = writeln!(
        out,
        "Equipment: {}   Weight: {:.0} lb   Pickup: {}",
        quote.equipment_type.label(),
        quote.weight,
        iso_date::format(&quote.pickup_date)
    );
    let _ = writeln!(
        out,
        "Distance: {:.1} km   Estimated transit: {} day{}",
        quote.distance,
        quote.days,
        if quote.days == 1 { "" } else { "s" }
    );
    let _ = writeln!(out, "  Base rate         {:>12}", format_currency(quote.base_rate));
    if quote.equipment_type != EquipmentType::DryVan {
        let _ = writeln!(
            out,
            "  Equipment charge  {:>12}",
            format_currency(quote.equipment_charge)
        );
    }
    let _ = writeln!(out, "  Fuel surcharge    {:>12}", format_currency(quote.fuel_surcharge));
    if quote.weight_factor > 0.0 {
        let _ = writeln!(out, "  Weight factor     {:>12}", format_currency(quote.weight_factor));
    }
    let _ = write!(out, "  Total             {:>12}", format_currency(quote.total));
    out
}

fn describe_error(err: &QuoteError) -> String {
    match err {
        QuoteError::RouteUnavailable { .. } => {
            format!("{err}. Check the locations and try again.")
        }
        QuoteError::LookupFailure(_) => format!("{err}. Nothing was recorded."),
        _ => err.to_string(),
    }
}
