use crate::domain::catalog::{Product, ProductId};
use crate::domain::money::Money;
use crate::error::InputError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

// Prices stay textual until parsed as decimals; csv would otherwise infer
// them as floats.
#[derive(Debug, Deserialize)]
struct CatalogRecord {
    id: ProductId,
    name: String,
    price: String,
    available: bool,
}

impl TryFrom<CatalogRecord> for Product {
    type Error = InputError;

    fn try_from(record: CatalogRecord) -> Result<Self, Self::Error> {
        let price =
            Decimal::from_str(&record.price).map_err(|source| InputError::InvalidPrice {
                value: record.price.clone(),
                source,
            })?;
        if price < Decimal::ZERO {
            return Err(InputError::NegativePrice {
                product_id: record.id,
                value: record.price,
            });
        }
        Ok(Product {
            id: record.id,
            name: record.name,
            price: Money::new(price),
            available: record.available,
        })
    }
}

/// Reads catalog products from a CSV source.
///
/// Expects the header `id,name,price,available`. Whitespace around fields is
/// trimmed and prices are normalised to two decimal places. Negative prices
/// are rejected.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes products.
    pub fn products(self) -> impl Iterator<Item = Result<Product, InputError>> {
        self.reader
            .into_deserialize::<CatalogRecord>()
            .map(|result| result.map_err(InputError::from).and_then(Product::try_from))
    }
}
