use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use thiserror::Error;

/// An open buy lot awaiting matching sell quantity
#[derive(Debug, Clone, PartialEq)]
pub struct OpenLot {
    pub opened_at: NaiveDateTime,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// The slice of a lot consumed by one sale
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedLot {
    pub opened_at: NaiveDateTime,
    pub quantity: Decimal,
    pub cost: Decimal,
}

/// Cost basis result for a sale
#[derive(Debug, Clone, PartialEq)]
pub struct SaleMatch {
    pub quantity: Decimal,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub profit_loss: Decimal,
    pub matched_lots: Vec<MatchedLot>,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("selling {requested} units but only {available} are open")]
pub struct InsufficientLots {
    pub requested: Decimal,
    pub available: Decimal,
}

/// FIFO matcher: each sale consumes the oldest open lots first
///
/// Scoped to a single instrument's history; drop it once the summary is built.
#[derive(Debug, Default)]
pub struct FifoMatcher {
    lots: VecDeque<OpenLot>,
}

impl FifoMatcher {
    pub fn new() -> Self {
        Self {
            lots: VecDeque::new(),
        }
    }

    pub fn add_purchase(&mut self, opened_at: NaiveDateTime, quantity: Decimal, price: Decimal) {
        if quantity <= Decimal::ZERO {
            return;
        }
        self.lots.push_back(OpenLot {
            opened_at,
            quantity,
            price,
        });
    }

    /// Match a sale against open lots, oldest first
    ///
    /// Overselling is rejected and leaves the open lots untouched.
    pub fn match_sale(
        &mut self,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<SaleMatch, InsufficientLots> {
        let available = self.open_quantity();
        if quantity > available {
            return Err(InsufficientLots {
                requested: quantity,
                available,
            });
        }

        let mut remaining = quantity;
        let mut cost_basis = Decimal::ZERO;
        let mut matched_lots = Vec::new();

        while remaining > Decimal::ZERO {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };

            let take = remaining.min(lot.quantity);
            let cost = take * lot.price;
            matched_lots.push(MatchedLot {
                opened_at: lot.opened_at,
                quantity: take,
                cost,
            });

            cost_basis += cost;
            remaining -= take;
            lot.quantity -= take;

            if lot.quantity.is_zero() {
                self.lots.pop_front();
            }
        }

        let proceeds = quantity * price;
        Ok(SaleMatch {
            quantity,
            proceeds,
            cost_basis,
            profit_loss: proceeds - cost_basis,
            matched_lots,
        })
    }

    pub fn open_quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    pub fn open_cost(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.quantity * lot.price).sum()
    }

    pub fn open_lots(&self) -> impl Iterator<Item = &OpenLot> {
        self.lots.iter()
    }
}
