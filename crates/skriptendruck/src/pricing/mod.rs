//! Price computation for print orders.
//!
//! All amounts are integer euro cents. `PricingEngine` is built once per
//! batch from a validated [`PriceTable`] and shared read-only between workers.

pub mod table;

use serde::{Deserialize, Serialize};

use crate::config::schema::PricingConfig;
use crate::error::ConfigError;
use crate::order::{BindingType, ColorMode};

pub use table::{PriceTable, RingSize};

/// Formats cents the way the print shop writes prices, e.g. `12,34 €`.
pub fn format_cents(cents: u64) -> String {
    format!("{},{:02} €", cents / 100, cents % 100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCalculation {
    pub color_mode: ColorMode,
    pub binding_type: BindingType,
    /// Ring size actually priced; `None` for other bindings.
    pub binding_size_mm: Option<u32>,
    pub pages_price: u64,
    pub binding_price: u64,
    pub total_price: u64,
    pub deposit: u64,
    pub price_after_deposit: u64,
}

impl PriceCalculation {
    pub fn pages_price_formatted(&self) -> String {
        format_cents(self.pages_price)
    }

    pub fn binding_price_formatted(&self) -> String {
        format_cents(self.binding_price)
    }

    pub fn total_price_formatted(&self) -> String {
        format_cents(self.total_price)
    }

    pub fn deposit_formatted(&self) -> String {
        format_cents(self.deposit)
    }

    pub fn price_after_deposit_formatted(&self) -> String {
        format_cents(self.price_after_deposit)
    }
}

/// Per-page and flat fees that are not part of the ring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub bw_page_cents: u64,
    pub color_page_cents: u64,
    pub folder_cents: u64,
    pub deposit_cents: u64,
}

impl From<&PricingConfig> for Rates {
    fn from(config: &PricingConfig) -> Self {
        Self {
            bw_page_cents: config.bw_page_cents,
            color_page_cents: config.color_page_cents,
            folder_cents: config.folder_cents,
            deposit_cents: config.deposit_cents,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricingEngine {
    table: PriceTable,
    rates: Rates,
}

impl PricingEngine {
    pub fn new(table: PriceTable, rates: Rates) -> Self {
        Self { table, rates }
    }

    /// Loads the configured price table, or the built-in one when none is set.
    pub fn from_config(config: &PricingConfig) -> Result<Self, ConfigError> {
        let table = match &config.price_table {
            Some(path) => PriceTable::load(path)?,
            None => PriceTable::default(),
        };
        Ok(Self::new(table, Rates::from(config)))
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }

    pub fn price(
        &self,
        page_count: u32,
        color_mode: ColorMode,
        binding_type: BindingType,
        binding_size_mm: Option<u32>,
    ) -> PriceCalculation {
        let per_page = match color_mode {
            ColorMode::Bw => self.rates.bw_page_cents,
            ColorMode::Color => self.rates.color_page_cents,
        };
        let pages_price = u64::from(page_count).saturating_mul(per_page);

        let (binding_price, priced_size) = match binding_type {
            BindingType::None => (0, None),
            BindingType::Folder => (self.rates.folder_cents, None),
            BindingType::Ring => {
                let ring = match binding_size_mm {
                    Some(size) => self.table.ring_for_size(size),
                    None => self.table.ring_for_pages(page_count),
                };
                (ring.price_cents, Some(ring.size_mm))
            }
        };

        let total_price = pages_price.saturating_add(binding_price);
        let deposit = self.rates.deposit_cents;

        PriceCalculation {
            color_mode,
            binding_type,
            binding_size_mm: priced_size,
            pages_price,
            binding_price,
            total_price,
            deposit,
            price_after_deposit: total_price.saturating_sub(deposit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new(
            PriceTable::default(),
            Rates {
                bw_page_cents: 4,
                color_page_cents: 10,
                folder_cents: 50,
                deposit_cents: 100,
            },
        )
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0,00 €");
        assert_eq!(format_cents(5), "0,05 €");
        assert_eq!(format_cents(1234), "12,34 €");
    }

    #[test]
    fn test_bw_ring_with_explicit_size() {
        let calc = engine().price(42, ColorMode::Bw, BindingType::Ring, Some(8));
        assert_eq!(calc.pages_price, 168);
        assert_eq!(calc.binding_size_mm, Some(8));
        assert_eq!(calc.binding_price, 175);
        assert_eq!(calc.total_price, 343);
        assert_eq!(calc.price_after_deposit, 243);
    }

    #[test]
    fn test_color_folder() {
        let calc = engine().price(10, ColorMode::Color, BindingType::Folder, None);
        assert_eq!(calc.pages_price, 100);
        assert_eq!(calc.binding_price, 50);
        assert_eq!(calc.binding_size_mm, None);
        assert_eq!(calc.total_price, 150);
    }

    #[test]
    fn test_no_binding_is_free() {
        let calc = engine().price(3, ColorMode::Bw, BindingType::None, None);
        assert_eq!(calc.binding_price, 0);
        assert_eq!(calc.total_price, 12);
    }

    #[test]
    fn test_ring_size_picked_by_page_count() {
        let calc = engine().price(100, ColorMode::Bw, BindingType::Ring, None);
        assert_eq!(calc.binding_size_mm, Some(14));
    }

    #[test]
    fn test_unknown_ring_size_uses_nearest() {
        let calc = engine().price(10, ColorMode::Bw, BindingType::Ring, Some(9));
        assert_eq!(calc.binding_size_mm, Some(10));
    }

    #[test]
    fn test_after_deposit_never_negative() {
        for pages in [1, 2, 5, 24, 25, 26] {
            let calc = engine().price(pages, ColorMode::Bw, BindingType::None, None);
            assert_eq!(
                calc.price_after_deposit,
                calc.total_price.saturating_sub(calc.deposit)
            );
        }
        let calc = engine().price(1, ColorMode::Bw, BindingType::None, None);
        assert_eq!(calc.price_after_deposit, 0);
    }

    #[test]
    fn test_price_non_decreasing_in_page_count() {
        let engine = engine();
        for color in [ColorMode::Bw, ColorMode::Color] {
            for (binding, size) in [
                (BindingType::None, None),
                (BindingType::Folder, None),
                (BindingType::Ring, None),
                (BindingType::Ring, Some(12)),
            ] {
                let mut previous = 0;
                for pages in 1..=600 {
                    let total = engine.price(pages, color, binding, size).total_price;
                    assert!(
                        total >= previous,
                        "{:?}/{:?} decreased at {} pages",
                        color,
                        binding,
                        pages
                    );
                    previous = total;
                }
            }
        }
    }

    #[test]
    fn test_formatted_accessors() {
        let calc = engine().price(42, ColorMode::Bw, BindingType::Ring, Some(8));
        assert_eq!(calc.total_price_formatted(), "3,43 €");
        assert_eq!(calc.deposit_formatted(), "1,00 €");
        assert_eq!(calc.price_after_deposit_formatted(), "2,43 €");
    }
}
