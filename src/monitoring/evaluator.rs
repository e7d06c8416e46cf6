use std::sync::Arc;

use crate::api::{ApiError, EsiClient, LineItem, Listing, MatchSignal};
use crate::registry::WatchList;

/// Runs assumed for an original blueprint (negative run count).
pub const ORIGINAL_RUNS: i64 = i16::MAX as i64;

/// How far (in millions) the asking price may sit above the reference value.
pub const MATCH_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Valuation {
    /// Sum of watched reference prices, in millions.
    pub reference_value: f64,
    /// Some line item stays with the seller.
    pub excluded: bool,
}

fn effective_runs(item: &LineItem) -> i64 {
    if item.runs < 0 {
        ORIGINAL_RUNS
    } else {
        item.runs as i64
    }
}

pub fn valuate(watchlist: &WatchList, items: &[LineItem]) -> Valuation {
    let mut valuation = Valuation::default();

    for item in items {
        if let Some(entry) = watchlist.get(item.type_id) {
            let units = effective_runs(item) * item.quantity as i64;
            valuation.reference_value += entry.price * units as f64;
        }
        if !item.is_included {
            valuation.excluded = true;
            break;
        }
    }

    valuation
}

/// The asking price must not exceed the watched value by more than
/// [`MATCH_TOLERANCE`]. Cheaper is always fine.
pub fn is_suitable(watchlist: &WatchList, listing: &Listing, items: &[LineItem]) -> bool {
    let valuation = valuate(watchlist, items);

    !valuation.excluded
        && valuation.reference_value > 0.0
        && listing.price_millions() - valuation.reference_value < MATCH_TOLERANCE
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_match: bool,
    pub items: Vec<LineItem>,
}

impl Evaluation {
    pub fn into_signal(self, listing: Listing) -> Option<MatchSignal> {
        if self.is_match {
            Some(MatchSignal {
                listing,
                items: self.items,
            })
        } else {
            None
        }
    }
}

pub struct SuitabilityEvaluator {
    client: Arc<EsiClient>,
}

impl SuitabilityEvaluator {
    pub fn new(client: Arc<EsiClient>) -> Self {
        Self { client }
    }

    /// All line items of a listing. Any failure other than the end of the
    /// pages is returned as-is; nothing is retried here.
    ///
    /// Line items are fetched once per listing, so an empty batch is the end
    /// of the pages too.
    pub async fn load_line_items(&self, listing_id: i64) -> Result<Vec<LineItem>, ApiError> {
        let mut page = 1;
        let mut items = Vec::with_capacity(2);

        loop {
            match self.client.get_line_items(listing_id, page).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => items.extend(batch),
                Err(ApiError::Exhausted) => break,
                Err(e) => return Err(e),
            }
            page += 1;
        }

        Ok(items)
    }

    pub async fn evaluate(&self, listing: &Listing, watchlist: &WatchList) -> Result<Evaluation, ApiError> {
        if watchlist.is_empty() {
            return Ok(Evaluation {
                is_match: false,
                items: Vec::new(),
            });
        }

        let items = self.load_line_items(listing.id).await?;
        let is_match = is_suitable(watchlist, listing, &items);

        Ok(Evaluation { is_match, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::esi::tests::{has_page, test_client};
    use crate::api::transport::{MockHttpTransport, RawResponse};
    use crate::api::types::fixtures::{item, listing};
    use crate::registry::WatchEntry;
    use mockall::Sequence;
    use reqwest::StatusCode;

    fn watchlist() -> WatchList {
        WatchList::from_entries([
            WatchEntry {
                type_id: 123,
                price: 40.99,
                type_name: "Foo".into(),
            },
            WatchEntry {
                type_id: 321,
                price: 899.50,
                type_name: "Bar".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_single_watched_item_below_value() {
        let items = [item(1, 321, 1, 1, true)];
        assert!(is_suitable(&watchlist(), &listing(144, 880_000_000.5), &items));
    }

    #[test]
    fn test_unwatched_item_never_matches() {
        let items = [item(2, 122, 1, 1, true)];
        assert!(!is_suitable(&watchlist(), &listing(144, 880_000_000.5), &items));
        assert!(!is_suitable(&watchlist(), &listing(144, 0.0), &items));
    }

    #[test]
    fn test_multiple_items_accumulate() {
        // 40.99 * 2 + 899.50 * 2 = 1880.98
        let items = [
            item(1, 123, 1, 2, true),
            item(2, 111, 2, 1, true),
            item(3, 321, 2, 1, true),
        ];
        let valuation = valuate(&watchlist(), &items);
        assert!((valuation.reference_value - 1880.98).abs() < 1e-9);
        assert!(is_suitable(&watchlist(), &listing(144, 1_880_000_000.88), &items));
    }

    #[test]
    fn test_price_above_value_rejected() {
        let items = [item(2, 123, 1, 2, true), item(3, 321, 2, 1, true)];
        assert!(!is_suitable(&watchlist(), &listing(144, 1_881_000_000.0), &items));
    }

    #[test]
    fn test_within_tolerance_accepted() {
        // 899.5 reference, asking 899.5009 M
        let items = [item(1, 321, 1, 1, true)];
        assert!(is_suitable(&watchlist(), &listing(1, 899_500_900.0), &items));
        assert!(!is_suitable(&watchlist(), &listing(1, 899_501_100.0), &items));
    }

    #[test]
    fn test_original_blueprint_counts_as_many_runs() {
        let items = [item(2, 123, -1, 2, true), item(3, 321, 2, 1, true)];
        let valuation = valuate(&watchlist(), &items);
        let expected = 40.99 * (ORIGINAL_RUNS * 2) as f64 + 899.50 * 2.0;
        assert!((valuation.reference_value - expected).abs() < 1e-6);
        assert!(is_suitable(&watchlist(), &listing(144, 18_900_000_000.0), &items));
    }

    #[test]
    fn test_excluded_item_disqualifies() {
        let items = [item(2, 123, 1, 2, true), item(3, 333, 2, 1, false)];
        assert!(valuate(&watchlist(), &items).excluded);
        assert!(!is_suitable(&watchlist(), &listing(144, 190_000_000.0), &items));
    }

    #[test]
    fn test_excluded_watched_item_disqualifies_cheap_listing() {
        let items = [item(1, 321, 5, 1, false)];
        assert!(!is_suitable(&watchlist(), &listing(1, 1.0), &items));
    }

    #[test]
    fn test_no_items_or_empty_watchlist_never_match() {
        assert!(!is_suitable(&watchlist(), &listing(1, 0.0), &[]));
        assert!(!is_suitable(
            &WatchList::new(),
            &listing(1, 0.0),
            &[item(1, 321, 1, 1, true)]
        ));
    }

    #[test]
    fn test_into_signal() {
        let evaluation = Evaluation {
            is_match: true,
            items: vec![item(1, 321, 1, 1, true)],
        };
        let signal = evaluation.into_signal(listing(5, 1.0)).unwrap();
        assert_eq!(signal.listing.id, 5);
        assert_eq!(signal.items.len(), 1);

        let miss = Evaluation {
            is_match: false,
            items: vec![],
        };
        assert!(miss.into_signal(listing(6, 1.0)).is_none());
    }

    #[tokio::test]
    async fn test_evaluate_collects_all_pages() {
        let mut transport = MockHttpTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_get()
            .withf(|url, _| url.path() == "/latest/contracts/public/items/144" && has_page(url, 1))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    StatusCode::OK,
                    None,
                    r#"[{"record_id": 1, "is_included": true, "quantity": 2, "runs": 1, "type_id": 123}]"#,
                ))
            });
        transport
            .expect_get()
            .withf(|url, _| has_page(url, 2))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    StatusCode::OK,
                    None,
                    r#"[{"record_id": 2, "is_included": true, "quantity": 1, "runs": 2, "type_id": 321}]"#,
                ))
            });
        transport
            .expect_get()
            .withf(|url, _| has_page(url, 3))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::NOT_FOUND, None, "")));

        let evaluator = SuitabilityEvaluator::new(Arc::new(test_client(transport)));
        let evaluation = evaluator
            .evaluate(&listing(144, 1_880_000_000.0), &watchlist())
            .await
            .unwrap();

        assert!(evaluation.is_match);
        assert_eq!(evaluation.items.len(), 2);
    }

    #[tokio::test]
    async fn test_evaluate_aborts_on_fetch_error_without_retry() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::INTERNAL_SERVER_ERROR, None, "")));

        let evaluator = SuitabilityEvaluator::new(Arc::new(test_client(transport)));
        let result = evaluator.evaluate(&listing(9, 1.0), &watchlist()).await;
        assert!(matches!(result, Err(ApiError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_no_content_ends_line_items() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .withf(|url, _| has_page(url, 1))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::NO_CONTENT, None, "")));

        let evaluator = SuitabilityEvaluator::new(Arc::new(test_client(transport)));
        let evaluation = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            evaluator.evaluate(&listing(9, 1.0), &watchlist()),
        )
        .await
        .expect("evaluate kept paging past a 204")
        .unwrap();

        assert!(!evaluation.is_match);
        assert!(evaluation.items.is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_page_ends_line_items() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .withf(|url, _| has_page(url, 1))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::NOT_MODIFIED, None, "")));

        let evaluator = SuitabilityEvaluator::new(Arc::new(test_client(transport)));
        let items = evaluator.load_line_items(9).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_empty_watchlist_skips_fetch() {
        let transport = MockHttpTransport::new();
        let evaluator = SuitabilityEvaluator::new(Arc::new(test_client(transport)));

        let evaluation = evaluator
            .evaluate(&listing(9, 1.0), &WatchList::new())
            .await
            .unwrap();
        assert!(!evaluation.is_match);
        assert!(evaluation.items.is_empty());
    }
}
