//! Card Lookup Layer
//!
//! Resolves OCR text to a card through a fuzzy name service, off the scan
//! loop.

pub mod dispatcher;
pub mod scryfall;

pub use dispatcher::LookupDispatcher;
pub use scryfall::ScryfallClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ScanResult;
use crate::shared::CardInfo;

/// Price shown when the service has no USD price at all
pub const NO_PRICE: &str = "N/A";

/// Fuzzy card name lookup
#[async_trait]
pub trait CardLookup: Send + Sync {
    /// Resolve a free-text query to a card record
    async fn lookup(&self, query: &str) -> ScanResult<CardRecord>;
}

/// Card record returned by the lookup service
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default = "unknown")]
    pub set_name: String,
    #[serde(default)]
    pub prices: Prices,
}

/// Price variants of a card, all optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Prices {
    #[serde(default)]
    pub usd: Option<String>,
    #[serde(default)]
    pub usd_foil: Option<String>,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl Prices {
    /// Regular USD price, falling back to foil, then to "N/A"
    pub fn display(&self) -> String {
        let present = |price: &Option<String>| {
            price
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };
        match present(&self.usd).or_else(|| present(&self.usd_foil)) {
            Some(price) => format!("${}", price),
            None => NO_PRICE.to_string(),
        }
    }
}

impl CardRecord {
    /// Displayable card info for a successful lookup
    pub fn to_card_info(&self) -> CardInfo {
        CardInfo {
            name: self.name.clone(),
            set: self.set_name.clone(),
            price: self.prices.display(),
            found: true,
        }
    }
}

/// Collapse OCR line breaks into spaces and trim
pub fn normalize_query(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(usd: Option<&str>, usd_foil: Option<&str>) -> Prices {
        Prices {
            usd: usd.map(str::to_string),
            usd_foil: usd_foil.map(str::to_string),
        }
    }

    #[test]
    fn test_price_prefers_usd() {
        assert_eq!(prices(Some("5.00"), Some("9.00")).display(), "$5.00");
    }

    #[test]
    fn test_price_falls_back_to_foil() {
        assert_eq!(prices(None, Some("9.00")).display(), "$9.00");
        assert_eq!(prices(Some(""), Some("9.00")).display(), "$9.00");
    }

    #[test]
    fn test_price_not_available() {
        assert_eq!(prices(None, None).display(), "N/A");
    }

    #[test]
    fn test_parse_service_response() {
        let body = r#"{
            "object": "card",
            "name": "Black Lotus",
            "set_name": "Vintage Masters",
            "prices": {"usd": "5.00", "usd_foil": null, "eur": "4.10"}
        }"#;
        let record: CardRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.name, "Black Lotus");
        assert_eq!(record.set_name, "Vintage Masters");

        let info = record.to_card_info();
        assert_eq!(info.price, "$5.00");
        assert!(info.found);
    }

    #[test]
    fn test_parse_sparse_response() {
        let record: CardRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.name, "Unknown");
        assert_eq!(record.set_name, "Unknown");
        assert_eq!(record.to_card_info().price, "N/A");
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Black\nLotus \r\n"), "Black Lotus");
    }
}
