//! Cart and order totals.
//!
//! Everything here is a pure function of the line items and a settings
//! snapshot, so the same cart priced against the same settings always yields
//! the same totals.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CreateOrderItem, OrderItemEntity, StoreSettingsEntity};

/// A priced line: quantity times unit price snapshot.
pub trait PricedLine {
    fn quantity(&self) -> i32;
    fn unit_price(&self) -> f64;

    fn line_total(&self) -> f64 {
        f64::from(self.quantity()) * self.unit_price()
    }
}

impl PricedLine for CreateOrderItem {
    fn quantity(&self) -> i32 {
        self.qty
    }

    fn unit_price(&self) -> f64 {
        self.price
    }
}

impl PricedLine for OrderItemEntity {
    fn quantity(&self) -> i32 {
        self.qty
    }

    fn unit_price(&self) -> f64 {
        self.price
    }
}

/// The subset of store settings the pricing rules read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingSettings {
    /// Subtotals at or above this value ship for free.
    pub delivery_fee_threshold: f64,
    pub base_delivery_fee: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            delivery_fee_threshold: 50.0,
            base_delivery_fee: 5.0,
        }
    }
}

impl From<&StoreSettingsEntity> for PricingSettings {
    fn from(settings: &StoreSettingsEntity) -> Self {
        Self {
            delivery_fee_threshold: settings.delivery_fee_threshold,
            base_delivery_fee: settings.base_delivery_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub grand_total: f64,
}

pub fn subtotal<L: PricedLine>(items: &[L]) -> f64 {
    items.iter().map(PricedLine::line_total).sum()
}

pub fn delivery_fee(subtotal: f64, settings: &PricingSettings) -> f64 {
    if subtotal >= settings.delivery_fee_threshold {
        0.0
    } else {
        settings.base_delivery_fee
    }
}

pub fn compute_totals<L: PricedLine>(items: &[L], settings: &PricingSettings) -> Totals {
    let subtotal = subtotal(items);
    let delivery_fee = delivery_fee(subtotal, settings);
    Totals {
        subtotal,
        delivery_fee,
        grand_total: subtotal + delivery_fee,
    }
}

/// Whether a submitted total reconciles with the items, within a cent.
pub fn total_matches(submitted: f64, expected: &Totals) -> bool {
    (submitted - expected.grand_total).abs() < 0.005
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(i32, f64);

    impl PricedLine for Line {
        fn quantity(&self) -> i32 {
            self.0
        }

        fn unit_price(&self) -> f64 {
            self.1
        }
    }

    fn settings(threshold: f64, fee: f64) -> PricingSettings {
        PricingSettings {
            delivery_fee_threshold: threshold,
            base_delivery_fee: fee,
        }
    }

    #[test]
    fn free_delivery_above_threshold() {
        let items = [Line(2, 25.0), Line(1, 30.0)];
        let totals = compute_totals(&items, &settings(50.0, 5.0));

        assert_eq!(
            totals,
            Totals {
                subtotal: 80.0,
                delivery_fee: 0.0,
                grand_total: 80.0,
            }
        );
    }

    #[test]
    fn base_fee_below_threshold() {
        let items = [Line(2, 25.0), Line(1, 30.0)];
        let totals = compute_totals(&items, &settings(100.0, 5.0));

        assert_eq!(totals.subtotal, 80.0);
        assert_eq!(totals.delivery_fee, 5.0);
        assert_eq!(totals.grand_total, 85.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let items = [Line(1, 50.0)];
        assert_eq!(compute_totals(&items, &settings(50.0, 7.5)).delivery_fee, 0.0);

        let items = [Line(1, 49.99)];
        assert_eq!(compute_totals(&items, &settings(50.0, 7.5)).delivery_fee, 7.5);
    }

    #[test]
    fn empty_cart_has_zero_subtotal() {
        let items: [Line; 0] = [];
        let totals = compute_totals(&items, &PricingSettings::default());
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.delivery_fee, 5.0);
    }

    #[test]
    fn subtotal_is_sum_of_line_totals_for_many_carts() {
        for qty in 0..6 {
            for cents in [0, 1, 99, 250, 1_000] {
                let price = f64::from(cents) / 100.0;
                let items = [Line(qty, price), Line(qty + 1, price * 2.0)];
                let expected = f64::from(qty) * price + f64::from(qty + 1) * price * 2.0;
                let subtotal = subtotal(&items);
                assert!((subtotal - expected).abs() < 1e-9);
                assert!(subtotal >= 0.0);
            }
        }
    }

    #[test]
    fn same_inputs_give_same_totals() {
        let items = [Line(3, 12.5), Line(1, 4.25)];
        let settings = settings(40.0, 5.0);
        assert_eq!(
            compute_totals(&items, &settings),
            compute_totals(&items, &settings)
        );
    }

    #[test]
    fn submitted_total_reconciliation() {
        let items = [Line(2, 25.0), Line(1, 30.0)];
        let totals = compute_totals(&items, &settings(100.0, 5.0));
        assert!(total_matches(85.0, &totals));
        assert!(!total_matches(80.0, &totals));
    }
}
