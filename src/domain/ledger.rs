//! The persisted, date-ordered collection of past quotes.

use tracing::{debug, info, warn};

use super::entities::{EquipmentType, Quote};
use crate::util::persistence::{KeyValueStore, StoreError};

/// Store key holding the serialized ledger.
pub const LEDGER_KEY: &str = "quotes";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("the ledger changed since this view was built; rebuild it")]
    StaleView,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ledger shared between tasks; holding the lock makes read-modify-persist atomic.
pub type SharedLedger<S> = std::sync::Arc<tokio::sync::Mutex<QuoteLedger<S>>>;

/// Filter options for the ledger view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub origin: String,
    pub destination: String,
    /// `None` matches any equipment.
    pub equipment: Option<EquipmentType>,
}

impl FilterCriteria {
    pub fn matches(&self, quote: &Quote) -> bool {
        if !quote.matches_origin(self.origin.trim()) {
            return false;
        }
        if !quote.matches_destination(self.destination.trim()) {
            return false;
        }
        if let Some(kind) = self.equipment {
            if quote.equipment_type != kind {
                return false;
            }
        }
        true
    }
}

/// One page of a sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based.
    pub number: usize,
    pub total_pages: usize,
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// Contiguous 1-based slice of `items`. Out-of-range pages come back empty.
pub fn paginate<T>(items: &[T], page_size: usize, page_number: usize) -> Page<'_, T> {
    let size = page_size.max(1);
    let total = total_pages(items.len(), size);
    let slice = if page_number == 0 || page_number > total {
        &items[..0]
    } else {
        let start = (page_number - 1) * size;
        let end = (start + size).min(items.len());
        &items[start..end]
    };
    Page {
        items: slice,
        number: page_number,
        total_pages: total,
    }
}

/// Nearest page that exists for a sequence of `len` items (page 1 when empty).
pub fn clamp_page(len: usize, page_size: usize, page_number: usize) -> usize {
    page_number.clamp(1, total_pages(len, page_size).max(1))
}

/// A filtered, paginated window onto the ledger.
///
/// Rows are addressed by their 0-based position on the page; [`LedgerView::ledger_index`]
/// maps that back to the position in the ledger. A view is only valid for the ledger
/// generation it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerView {
    positions: Vec<usize>,
    criteria: FilterCriteria,
    generation: u64,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub matched: usize,
}

impl LedgerView {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn ledger_index(&self, view_index: usize) -> Option<usize> {
        self.positions.get(view_index).copied()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct QuoteLedger<S> {
    store: S,
    quotes: Vec<Quote>,
    /// Bumped on every committed mutation.
    generation: u64,
}

impl<S: KeyValueStore> QuoteLedger<S> {
    /// Load the ledger from `store`; an absent key yields an empty ledger.
    pub fn load(store: S) -> Result<Self, StoreError> {
        let quotes = match store.get(LEDGER_KEY)? {
            Some(raw) => {
                let mut quotes: Vec<Quote> = serde_json::from_str(&raw)
                    .map_err(|err| StoreError::Corrupt(format!("quote ledger: {err}")))?;
                sort_by_pickup(&mut quotes);
                quotes
            }
            None => Vec::new(),
        };
        info!(count = quotes.len(), "loaded quote ledger");
        Ok(Self {
            store,
            quotes,
            generation: 0,
        })
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Insert a quote, keep the ledger ordered by pickup date and persist it.
    pub fn insert(&mut self, quote: Quote) -> Result<&[Quote], StoreError> {
        let mut next = self.quotes.clone();
        next.push(quote);
        sort_by_pickup(&mut next);
        self.commit(next)?;
        Ok(&self.quotes)
    }

    /// Remove the quote at `index` (a ledger position) and persist.
    ///
    /// Returns `Ok(None)` when the index is out of range.
    pub fn delete_at(&mut self, index: usize) -> Result<Option<Quote>, StoreError> {
        if index >= self.quotes.len() {
            return Ok(None);
        }
        let mut next = self.quotes.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        debug!(index, origin = %removed.origin, destination = %removed.destination, "deleted quote");
        Ok(Some(removed))
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<&Quote> {
        self.quotes.iter().filter(|q| criteria.matches(q)).collect()
    }

    /// Build the view the caller displays for `criteria` at `page`.
    pub fn view(&self, criteria: &FilterCriteria, page_size: usize, page: usize) -> LedgerView {
        let matched: Vec<usize> = self
            .quotes
            .iter()
            .enumerate()
            .filter(|(_, q)| criteria.matches(q))
            .map(|(i, _)| i)
            .collect();
        let window = paginate(&matched, page_size, page);
        LedgerView {
            positions: window.items.to_vec(),
            criteria: criteria.clone(),
            generation: self.generation,
            page,
            page_size: page_size.max(1),
            total_pages: window.total_pages,
            matched: matched.len(),
        }
    }

    /// Delete the row at `view_index` of `view` and return the page the view should show
    /// next, pulled back when the current page no longer exists.
    ///
    /// Fails with [`LedgerError::StaleView`] if the ledger changed after `view` was built.
    pub fn delete_in_view(
        &mut self,
        view: &LedgerView,
        view_index: usize,
    ) -> Result<Option<(Quote, usize)>, LedgerError> {
        if view.generation != self.generation {
            warn!(
                view = view.generation,
                ledger = self.generation,
                "rejected delete through a stale view"
            );
            return Err(LedgerError::StaleView);
        }
        let Some(index) = view.ledger_index(view_index) else {
            return Ok(None);
        };
        let Some(removed) = self.delete_at(index)? else {
            return Ok(None);
        };
        let remaining = self.quotes.iter().filter(|q| view.criteria.matches(q)).count();
        let page = clamp_page(remaining, view.page_size, view.page);
        Ok(Some((removed, page)))
    }

    fn commit(&mut self, next: Vec<Quote>) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next)?;
        self.store.set(LEDGER_KEY, &json)?;
        self.quotes = next;
        self.generation += 1;
        debug!(count = self.quotes.len(), "persisted quote ledger");
        Ok(())
    }
}

fn sort_by_pickup(quotes: &mut [Quote]) {
    // `sort_by_key` is stable, so same-day quotes keep insertion order.
    quotes.sort_by_key(|q| q.pickup_date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::persistence::MemoryStore;
    use time::{macros::date, Date};

    fn quote(origin: &str, destination: &str, kind: EquipmentType, pickup: Date) -> Quote {
        Quote {
            origin: origin.into(),
            destination: destination.into(),
            equipment_type: kind,
            weight: 1_000.0,
            pickup_date: pickup,
            distance: 100.0,
            days: 1,
            base_rate: 161.6,
            equipment_charge: 0.0,
            fuel_surcharge: 38.2992,
            weight_factor: 0.0,
            total: 199.8992,
        }
    }

    #[test]
    fn paginate_slices_one_based() {
        let items = [1, 2, 3, 4, 5];
        let page = paginate(&items, 2, 1);
        assert_eq!(page.items, &[1, 2]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginate(&items, 2, 3).items, &[5]);
        assert!(paginate(&items, 2, 4).items.is_empty());
        assert!(paginate(&items, 2, 0).items.is_empty());
        assert!(paginate::<i32>(&[], 2, 1).items.is_empty());
    }

    #[test]
    fn clamp_page_pulls_back_to_last_page() {
        assert_eq!(clamp_page(4, 2, 3), 2);
        assert_eq!(clamp_page(5, 2, 3), 3);
        assert_eq!(clamp_page(0, 2, 3), 1);
        assert_eq!(clamp_page(10, 2, 0), 1);
    }

    #[test]
    fn insert_orders_by_pickup_date_and_keeps_ties_stable() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        ledger
            .insert(quote("C", "X", EquipmentType::DryVan, date!(2024 - 05 - 03)))
            .unwrap();
        ledger
            .insert(quote("A", "X", EquipmentType::DryVan, date!(2024 - 05 - 01)))
            .unwrap();
        ledger
            .insert(quote("B1", "X", EquipmentType::DryVan, date!(2024 - 05 - 02)))
            .unwrap();
        let quotes = ledger
            .insert(quote("B2", "X", EquipmentType::DryVan, date!(2024 - 05 - 02)))
            .unwrap();

        let origins: Vec<_> = quotes.iter().map(|q| q.origin.as_str()).collect();
        assert_eq!(origins, ["A", "B1", "B2", "C"]);
    }

    #[test]
    fn persisted_copy_matches_memory_after_each_mutation() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut ledger = QuoteLedger::load(store.clone()).unwrap();
        ledger
            .insert(quote("A", "B", EquipmentType::Reefer, date!(2024 - 01 - 02)))
            .unwrap();
        ledger
            .insert(quote("C", "D", EquipmentType::Flatbed, date!(2024 - 01 - 01)))
            .unwrap();

        let stored: Vec<Quote> =
            serde_json::from_str(&store.get(LEDGER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, ledger.quotes());

        ledger.delete_at(0).unwrap();
        let stored: Vec<Quote> =
            serde_json::from_str(&store.get(LEDGER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, ledger.quotes());
        assert_eq!(stored.len(), 1);

        let reloaded = QuoteLedger::load(store).unwrap();
        assert_eq!(reloaded.quotes(), ledger.quotes());
    }

    #[test]
    fn corrupt_ledger_fails_to_load() {
        let store = MemoryStore::new();
        store.set(LEDGER_KEY, "not json").unwrap();
        assert!(matches!(QuoteLedger::load(store), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn delete_out_of_range_is_a_no_op() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        assert_eq!(ledger.delete_at(0).unwrap(), None);
    }

    #[test]
    fn filter_by_equipment_and_substrings() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        ledger
            .insert(quote("Chicago", "Dallas", EquipmentType::Reefer, date!(2024 - 01 - 01)))
            .unwrap();
        ledger
            .insert(quote("Boston", "Denver", EquipmentType::DryVan, date!(2024 - 01 - 02)))
            .unwrap();
        ledger
            .insert(quote("chicago", "Denver", EquipmentType::Flatbed, date!(2024 - 01 - 03)))
            .unwrap();

        assert_eq!(ledger.filter(&FilterCriteria::default()).len(), 3);

        let reefers = ledger.filter(&FilterCriteria {
            equipment: Some(EquipmentType::Reefer),
            ..Default::default()
        });
        assert_eq!(reefers.len(), 1);
        assert!(reefers.iter().all(|q| q.equipment_type == EquipmentType::Reefer));

        let from_chicago = ledger.filter(&FilterCriteria {
            origin: "CHI".into(),
            ..Default::default()
        });
        assert_eq!(from_chicago.len(), 2);

        let to_denver_flatbed = ledger.filter(&FilterCriteria {
            destination: "den".into(),
            equipment: Some(EquipmentType::Flatbed),
            ..Default::default()
        });
        assert_eq!(to_denver_flatbed.len(), 1);
        assert_eq!(to_denver_flatbed[0].origin, "chicago");
    }

    #[test]
    fn view_index_maps_to_ledger_position() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        for (i, kind) in [
            EquipmentType::DryVan,
            EquipmentType::Reefer,
            EquipmentType::DryVan,
            EquipmentType::Reefer,
            EquipmentType::Reefer,
        ]
        .into_iter()
        .enumerate()
        {
            let pickup = date!(2024 - 02 - 01).saturating_add(time::Duration::days(i as i64));
            ledger.insert(quote(&format!("O{i}"), "D", kind, pickup)).unwrap();
        }

        let reefers = FilterCriteria {
            equipment: Some(EquipmentType::Reefer),
            ..Default::default()
        };
        // Reefers sit at ledger positions 1, 3, 4; page 2 of size 2 holds only position 4.
        let view = ledger.view(&reefers, 2, 2);
        assert_eq!(view.positions(), &[4]);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.ledger_index(0), Some(4));
        assert_eq!(view.ledger_index(1), None);

        let first = ledger.view(&reefers, 2, 1);
        assert_eq!(first.positions(), &[1, 3]);
    }

    #[test]
    fn deleting_last_row_of_last_page_moves_view_back() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        for day in 1..=3u8 {
            let pickup = Date::from_calendar_date(2024, time::Month::March, day).unwrap();
            ledger
                .insert(quote(&format!("O{day}"), "D", EquipmentType::Flatbed, pickup))
                .unwrap();
        }
        ledger
            .insert(quote("other", "D", EquipmentType::DryVan, date!(2024 - 03 - 02)))
            .unwrap();

        let flatbeds = FilterCriteria {
            equipment: Some(EquipmentType::Flatbed),
            ..Default::default()
        };
        let view = ledger.view(&flatbeds, 2, 2);
        assert_eq!(view.len(), 1);

        let (removed, page) = ledger
            .delete_in_view(&view, 0)
            .unwrap()
            .unwrap();
        assert_eq!(removed.origin, "O3");
        assert_eq!(page, 1);

        let after = ledger.view(&flatbeds, 2, page);
        assert_eq!(after.len(), 2);
        assert_eq!(after.total_pages, 1);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn deleting_everything_leaves_page_one() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        ledger
            .insert(quote("A", "B", EquipmentType::DryVan, date!(2024 - 01 - 01)))
            .unwrap();
        let criteria = FilterCriteria::default();
        let view = ledger.view(&criteria, 5, 1);
        let (_, page) = ledger.delete_in_view(&view, 0).unwrap().unwrap();
        assert_eq!(page, 1);
        assert!(ledger.is_empty());
        assert!(ledger.view(&criteria, 5, page).is_empty());
    }

    #[test]
    fn view_remembers_its_filter() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        ledger
            .insert(quote("A", "B", EquipmentType::Reefer, date!(2024 - 01 - 01)))
            .unwrap();
        ledger
            .insert(quote("C", "D", EquipmentType::DryVan, date!(2024 - 01 - 02)))
            .unwrap();
        ledger
            .insert(quote("E", "F", EquipmentType::Reefer, date!(2024 - 01 - 03)))
            .unwrap();

        let reefers = FilterCriteria {
            equipment: Some(EquipmentType::Reefer),
            ..Default::default()
        };
        // Page 2 of size 1 holds the second reefer; deleting it leaves one reefer, so the
        // page clamps back to 1 even though two quotes remain overall.
        let view = ledger.view(&reefers, 1, 2);
        assert_eq!(view.criteria(), &reefers);
        let (removed, page) = ledger.delete_in_view(&view, 0).unwrap().unwrap();
        assert_eq!(removed.origin, "E");
        assert_eq!(page, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn stale_view_is_rejected_and_ledger_untouched() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut ledger = QuoteLedger::load(store.clone()).unwrap();
        ledger
            .insert(quote("B", "X", EquipmentType::DryVan, date!(2024 - 01 - 02)))
            .unwrap();
        let criteria = FilterCriteria::default();
        let view = ledger.view(&criteria, 5, 1);
        assert_eq!(view.generation(), ledger.generation());

        // An earlier pickup date shifts every position the view recorded.
        ledger
            .insert(quote("A", "X", EquipmentType::DryVan, date!(2024 - 01 - 01)))
            .unwrap();
        let before = ledger.quotes().to_vec();
        let persisted = store.get(LEDGER_KEY).unwrap();

        assert!(matches!(
            ledger.delete_in_view(&view, 0),
            Err(LedgerError::StaleView)
        ));
        assert_eq!(ledger.quotes(), before.as_slice());
        assert_eq!(store.get(LEDGER_KEY).unwrap(), persisted);

        let fresh = ledger.view(&criteria, 5, 1);
        let (removed, _) = ledger.delete_in_view(&fresh, 0).unwrap().unwrap();
        assert_eq!(removed.origin, "A");
    }

    #[test]
    fn no_op_delete_keeps_generation() {
        let mut ledger = QuoteLedger::load(MemoryStore::new()).unwrap();
        assert_eq!(ledger.generation(), 0);
        ledger
            .insert(quote("A", "X", EquipmentType::DryVan, date!(2024 - 01 - 01)))
            .unwrap();
        assert_eq!(ledger.generation(), 1);
        assert_eq!(ledger.delete_at(5).unwrap(), None);
        assert_eq!(ledger.generation(), 1);
    }
}
