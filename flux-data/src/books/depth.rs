use super::Level;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One level of a [`DepthSnapshot`] side.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct DepthLevel {
    pub price: Decimal,
    /// Absolute amount resting at this price.
    pub amount: Decimal,
    /// Absolute amount resting from the best price up to and including this level.
    pub cum_amount: Decimal,
    /// Volume-weighted average price from the best price up to and including this level.
    pub vwap: Decimal,
}

/// Cumulative depth view of an order book taken at a window boundary.
///
/// Bids are sorted best (highest) first, asks best (lowest) first. Levels with a zero
/// amount are excluded.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct DepthSnapshot {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl DepthSnapshot {
    /// Build a full snapshot from a set of signed [`Level`]s.
    pub fn from_levels<'a>(levels: impl IntoIterator<Item = &'a Level>) -> Self {
        let (bids, asks): (Vec<Level>, Vec<Level>) = levels
            .into_iter()
            .filter(|level| !level.amount.is_zero())
            .copied()
            .partition(|level| level.amount.is_sign_positive());

        Self {
            bids: cumulate(bids.into_iter().sorted_by(|a, b| b.price.cmp(&a.price))),
            asks: cumulate(asks.into_iter().sorted_by_key(|level| level.price)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Running cumulative amount and VWAP over levels already sorted best first.
fn cumulate(sorted: impl IntoIterator<Item = Level>) -> Vec<DepthLevel> {
    let mut cum_amount = Decimal::ZERO;
    let mut cum_notional = Decimal::ZERO;

    sorted
        .into_iter()
        .map(|level| {
            let amount = level.amount.abs();
            cum_amount = cum_amount.saturating_add(amount);
            cum_notional = cum_notional.saturating_add(level.price.saturating_mul(amount));

            DepthLevel {
                price: level.price,
                amount,
                cum_amount,
                vwap: cum_notional.checked_div(cum_amount).unwrap_or(level.price),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, amount: Decimal) -> Level {
        Level::new(price, amount)
    }

    #[test]
    fn test_depth_snapshot_from_levels() {
        struct TestCase {
            input: Vec<Level>,
            expected: DepthSnapshot,
        }

        let tests = vec![
            TestCase {
                // TC0: empty book
                input: vec![],
                expected: DepthSnapshot::default(),
            },
            TestCase {
                // TC1: bids sorted descending, asks ascending w/ absolute amounts
                input: vec![
                    level(dec!(98), dec!(1)),
                    level(dec!(101), dec!(-1)),
                    level(dec!(100), dec!(1)),
                    level(dec!(102), dec!(-3)),
                ],
                expected: DepthSnapshot {
                    bids: vec![
                        DepthLevel {
                            price: dec!(100),
                            amount: dec!(1),
                            cum_amount: dec!(1),
                            vwap: dec!(100),
                        },
                        DepthLevel {
                            price: dec!(98),
                            amount: dec!(1),
                            cum_amount: dec!(2),
                            vwap: dec!(99),
                        },
                    ],
                    asks: vec![
                        DepthLevel {
                            price: dec!(101),
                            amount: dec!(1),
                            cum_amount: dec!(1),
                            vwap: dec!(101),
                        },
                        DepthLevel {
                            price: dec!(102),
                            amount: dec!(3),
                            cum_amount: dec!(4),
                            vwap: dec!(101.75),
                        },
                    ],
                },
            },
            TestCase {
                // TC2: zero amount levels are excluded
                input: vec![level(dec!(100), dec!(0)), level(dec!(101), dec!(-2))],
                expected: DepthSnapshot {
                    bids: vec![],
                    asks: vec![DepthLevel {
                        price: dec!(101),
                        amount: dec!(2),
                        cum_amount: dec!(2),
                        vwap: dec!(101),
                    }],
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = DepthSnapshot::from_levels(&test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
