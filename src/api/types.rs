use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing prices are quoted in ISK; reports and the match rule work in millions.
pub const PRICE_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    ItemExchange,
    Auction,
    Courier,
    Loan,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Unknown => "unknown",
            ListingKind::ItemExchange => "item_exchange",
            ListingKind::Auction => "auction",
            ListingKind::Courier => "courier",
            ListingKind::Loan => "loan",
        }
    }
}

/// A public contract as returned by `/contracts/public/{region_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "contract_id")]
    pub id: i64,
    #[serde(default)]
    pub buyout: f64,
    #[serde(default)]
    pub collateral: f64,
    #[serde(default)]
    pub price: f64,
    pub date_expired: DateTime<Utc>,
    pub date_issued: DateTime<Utc>,
    #[serde(default)]
    pub for_corporation: bool,
    #[serde(default)]
    pub issuer_corporation_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ListingKind,
    #[serde(default)]
    pub volume: f64,
}

impl Listing {
    /// Public item exchanges are the only listings worth evaluating.
    pub fn is_qualifying(&self) -> bool {
        self.kind == ListingKind::ItemExchange && !self.for_corporation
    }

    pub fn price_millions(&self) -> f64 {
        self.price / PRICE_UNIT
    }
}

/// One entry of `/contracts/public/items/{contract_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub record_id: i64,
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub is_blueprint_copy: bool,
    pub is_included: bool,
    #[serde(default)]
    pub material_efficiency: i32,
    #[serde(default)]
    pub time_efficiency: i32,
    /// Negative for an original blueprint, absent (0) for non-blueprints.
    #[serde(default)]
    pub runs: i32,
    pub quantity: i32,
    pub type_id: i64,
}

impl LineItem {
    pub fn is_original(&self) -> bool {
        self.runs < 0
    }
}

/// A listing that passed the suitability check, with the exact line items
/// the decision was made on.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSignal {
    pub listing: Listing,
    pub items: Vec<LineItem>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn listing(id: i64, price: f64) -> Listing {
        Listing {
            id,
            buyout: 0.0,
            collateral: 0.0,
            price,
            date_expired: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            date_issued: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
            for_corporation: false,
            issuer_corporation_id: 98000001,
            title: format!("contract {}", id),
            kind: ListingKind::ItemExchange,
            volume: 0.01,
        }
    }

    pub fn item(record_id: i64, type_id: i64, runs: i32, quantity: i32, is_included: bool) -> LineItem {
        LineItem {
            record_id,
            item_id: None,
            is_blueprint_copy: runs > 0,
            is_included,
            material_efficiency: 0,
            time_efficiency: 0,
            runs,
            quantity,
            type_id,
        }
    }
}
