//! Insertion-ordered ticker books used for holdings, prices and cost basis.
//!
//! A personal wallet tracks a few dozen tickers at most, so entries live in a
//! `Vec` with linear lookup. Order is the order in which a ticker was first
//! inserted, which is also the order the book serializes in.

use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetBook {
    entries: Vec<(String, Decimal)>,
}

impl AssetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticker: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == ticker)
    }

    /// Set a ticker's value, keeping its original position if already present.
    pub fn insert(&mut self, ticker: &str, value: Decimal) -> Option<Decimal> {
        match self.entries.iter_mut().find(|(t, _)| t == ticker) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((ticker.to_string(), value));
                None
            }
        }
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for AssetBook {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut book = AssetBook::new();
        for (ticker, value) in iter {
            book.insert(&ticker.into(), value);
        }
        book
    }
}

impl Serialize for AssetBook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ticker, value) in &self.entries {
            map.serialize_entry(ticker, value)?;
        }
        map.end()
    }
}

struct AssetBookVisitor;

impl<'de> Visitor<'de> for AssetBookVisitor {
    type Value = AssetBook;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of ticker to decimal")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AssetBook, A::Error> {
        let mut book = AssetBook::new();
        while let Some((ticker, value)) = access.next_entry::<String, Decimal>()? {
            book.insert(&ticker, value);
        }
        Ok(book)
    }
}

impl<'de> Deserialize<'de> for AssetBook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AssetBookVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut book = AssetBook::new();
        book.insert("USDT", dec!(100));
        book.insert("BTC", dec!(1));
        book.insert("ETH", dec!(2));

        assert_eq!(book.insert("USDT", dec!(50)), Some(dec!(100)));
        assert_eq!(book.tickers().collect::<Vec<_>>(), vec!["USDT", "BTC", "ETH"]);
        assert_eq!(book.get("USDT"), Some(dec!(50)));
        assert_eq!(book.get("LTC"), None);
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let book: AssetBook = vec![("ZEC", dec!(1)), ("ADA", dec!(2))].into_iter().collect();
        let json = serde_json::to_string(&book).unwrap();
        assert_eq!(json, r#"{"ZEC":1,"ADA":2}"#);
    }

    #[test]
    fn test_serialized_numbers_keep_scale() {
        let book: AssetBook = vec![("BTC", dec!(0.10)), ("ETH", dec!(1581.860))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&book).unwrap();
        assert_eq!(json, r#"{"BTC":0.10,"ETH":1581.860}"#);

        let back: AssetBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let book: AssetBook = serde_json::from_str(r#"{"USDT":100,"BTC":"0.5"}"#).unwrap();
        assert_eq!(book.get("USDT"), Some(dec!(100)));
        assert_eq!(book.get("BTC"), Some(dec!(0.5)));
        assert_eq!(book.tickers().collect::<Vec<_>>(), vec!["USDT", "BTC"]);
    }
}
