use serde::{Deserialize, Serialize};

use crate::domain::order::LineItem;
use crate::domain::ValidationError;

/// Prices are whole currency units, the same unit the totals are stored in.
pub type Price = i64;

const PIES: &[(&str, Price)] = &[
    ("Мясо с тыквой", 9000),
    ("Мясо с картошкой", 9000),
    ("Мясо с капустой", 9000),
    ("Курица с картошкой", 7000),
    ("Курица с капустой", 7000),
    ("Курица с грибами", 10000),
    ("Морской язык", 8000),
    ("Брынза со шпинатом", 8000),
    ("Яблочный", 7000),
    ("Творожный", 7000),
    ("Сёмга", 20000),
    ("Восточный", 10000),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub price: Price,
}

/// Read-only item name to unit price table. Item order is the display order.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    /// Exact-name price lookup.
    pub fn price_of(&self, name: &str) -> Option<Price> {
        self.items
            .iter()
            .find(|it| it.name == name)
            .map(|it| it.price)
    }

    /// Lookup for typed operator input: surrounding whitespace and case are ignored.
    pub fn find(&self, input: &str) -> Option<&CatalogItem> {
        let wanted = input.trim().to_lowercase();
        self.items.iter().find(|it| it.name.to_lowercase() == wanted)
    }

    pub fn line_item(&self, name: &str, quantity: u32) -> Result<LineItem, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::BadQuantity(quantity.to_string()));
        }
        if self.price_of(name).is_none() {
            return Err(ValidationError::UnknownItem(name.to_string()));
        }
        Ok(LineItem::new_unchecked(name.to_string(), quantity))
    }

    /// Sum of unit price times quantity. Fails on the first item missing from the catalog.
    pub fn total(&self, items: &[LineItem]) -> Result<Price, ValidationError> {
        items.iter().try_fold(0, |acc, it| {
            let price = self
                .price_of(it.name())
                .ok_or_else(|| ValidationError::UnknownItem(it.name().to_string()))?;
            Ok(acc + price * Price::from(it.quantity()))
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(
            PIES.iter()
                .map(|(name, price)| CatalogItem {
                    name: (*name).to_string(),
                    price: *price,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_prices() {
        let catalog = Catalog::default();
        assert_eq!(catalog.items().len(), 12);
        assert_eq!(catalog.price_of("Яблочный"), Some(7000));
        assert_eq!(catalog.price_of("Сёмга"), Some(20000));
        assert_eq!(catalog.price_of("Пицца"), None);
    }

    #[test]
    fn find_ignores_case_and_whitespace() {
        let catalog = Catalog::default();
        let found = catalog.find("  яблочный ").unwrap();
        assert_eq!(found.name, "Яблочный");
        assert!(catalog.find("яблоко").is_none());
    }

    #[test]
    fn line_item_rejects_unknown_and_zero() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.line_item("Пицца", 1),
            Err(ValidationError::UnknownItem("Пицца".into()))
        );
        assert!(matches!(
            catalog.line_item("Яблочный", 0),
            Err(ValidationError::BadQuantity(_))
        ));
        let item = catalog.line_item("Яблочный", 3).unwrap();
        assert_eq!(item.quantity(), 3);
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let catalog = Catalog::default();
        let items = vec![
            catalog.line_item("Яблочный", 2).unwrap(),
            catalog.line_item("Сёмга", 1).unwrap(),
        ];
        assert_eq!(catalog.total(&items), Ok(34000));
    }

    #[test]
    fn total_fails_for_item_missing_from_catalog() {
        let full = Catalog::default();
        let items = vec![full.line_item("Сёмга", 1).unwrap()];
        let small = Catalog::new(vec![CatalogItem {
            name: "Яблочный".into(),
            price: 7000,
        }]);
        assert_eq!(
            small.total(&items),
            Err(ValidationError::UnknownItem("Сёмга".into()))
        );
    }
}
