//! # Billing Module
//!
//! Pure arithmetic for invoice totals, discount apportionment, refund
//! computation and due reconciliation. No I/O: the database layer feeds
//! these functions stored paisa/milli values and persists what comes
//! back.
//!
//! ## Reconciliation model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  grand_total = subtotal - discount          (stored, stable)    │
//! │  refund_total = Σ return subtotals          (derived at read)   │
//! │  due = max(0, grand_total - refund_total - paid)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! Refunds never rewrite the invoice's stored totals; every
//! returns-aware figure is recomputed from the ledger when read.

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round, Money};
use crate::quantity::Quantity;

// =============================================================================
// Invoice Totals
// =============================================================================

/// Resolves a sale line's total: the cashier's explicit figure wins
/// (discretionary rounding at the counter), otherwise rate × qty.
pub fn line_total(unit_price: Money, qty: Quantity, explicit: Option<Money>) -> Money {
    match explicit {
        Some(total) => total,
        None => unit_price.mul_quantity(qty),
    }
}

/// `subtotal - discount`, stored as-is. A discount above the subtotal
/// yields a negative grand total; only `due` and the effective total
/// clamp.
pub fn grand_total(subtotal: Money, discount: Money) -> Money {
    subtotal - discount
}

/// The returns-adjusted total a customer actually owes against.
pub fn effective_grand_total(grand_total: Money, refund_total: Money) -> Money {
    (grand_total - refund_total).clamp_non_negative()
}

/// Remaining due after refunds and all payments.
///
/// Clamped at zero: an over-refunded invoice owes the shop nothing,
/// and the system tracks no credit balance for the customer.
pub fn due(grand_total: Money, refund_total: Money, paid: Money) -> Money {
    (grand_total - refund_total - paid).clamp_non_negative()
}

// =============================================================================
// Discount Apportionment
// =============================================================================

/// Splits an invoice-level discount across lines by revenue share.
///
/// Each line gets `discount × line_total / subtotal` rounded to the
/// paisa, except the last line, which absorbs the rounding residual so
/// the shares always sum to exactly the discount. A zero subtotal
/// yields all-zero shares.
pub fn apportion_discount(line_totals: &[Money], discount: Money) -> Vec<Money> {
    if line_totals.is_empty() {
        return Vec::new();
    }
    let subtotal: Money = line_totals.iter().copied().sum();
    if subtotal.is_zero() || discount.is_zero() {
        return vec![Money::zero(); line_totals.len()];
    }

    let mut shares = Vec::with_capacity(line_totals.len());
    let mut allocated = Money::zero();
    for total in &line_totals[..line_totals.len() - 1] {
        let share = Money::from_paisa(div_round(
            discount.paisa() as i128 * total.paisa() as i128,
            subtotal.paisa() as i128,
        ) as i64);
        allocated += share;
        shares.push(share);
    }
    shares.push(discount - allocated);
    shares
}

/// Re-weights a variant's average unit cost when stock arrives.
///
/// `(on_hand × current_cost + incoming × incoming_cost) / total`,
/// rounded at the paisa. Callers only apply this for positive incoming
/// quantities with a known cost; a non-positive combined quantity
/// returns the current cost unchanged.
pub fn weighted_average_cost(
    on_hand: Quantity,
    current_cost: Money,
    incoming: Quantity,
    incoming_cost: Money,
) -> Money {
    let total = on_hand + incoming;
    if !total.is_positive() {
        return current_cost;
    }
    let numerator = on_hand.milli() as i128 * current_cost.paisa() as i128
        + incoming.milli() as i128 * incoming_cost.paisa() as i128;
    Money::from_paisa(div_round(numerator, total.milli() as i128) as i64)
}

/// Gross profit for one sold line: revenue after its discount share,
/// minus frozen cost × base quantity.
pub fn line_gross_profit(
    line_total: Money,
    discount_share: Money,
    cost_at_sale: Money,
    base_qty: Quantity,
) -> Money {
    line_total - discount_share - cost_at_sale.mul_quantity(base_qty)
}

// =============================================================================
// Refund Computation
// =============================================================================

/// Outcome of pricing one return line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundComputation {
    /// Refund rate per entered unit. Back-derived when an override is
    /// in play, for audit display only.
    pub effective_rate: Money,
    /// The amount actually refunded for the line.
    pub refund_amount: Money,
    /// The discretionary whole-line amount, preserved verbatim.
    pub refund_override: Option<Money>,
}

/// Prices a return line.
///
/// An override is a whole-line amount that supersedes the rate-derived
/// computation entirely; without one, the rate comes from the variant's
/// current base or alternate price depending on the unit the return is
/// entered in. An alt-unit return on a variant with no alternate price
/// is a configuration error (there is no rate to apply).
pub fn compute_refund(
    qty: Quantity,
    entered_in_base: bool,
    price_base: Money,
    price_alt: Option<Money>,
    refund_override: Option<Money>,
) -> CoreResult<RefundComputation> {
    if let Some(amount) = refund_override {
        return Ok(RefundComputation {
            effective_rate: amount.per_unit(qty),
            refund_amount: amount,
            refund_override: Some(amount),
        });
    }

    let rate = if entered_in_base {
        price_base
    } else {
        price_alt.ok_or_else(|| {
            CoreError::Configuration(
                "variant has no alternate-unit price for this return".to_string(),
            )
        })?
    };

    Ok(RefundComputation {
        effective_rate: rate,
        refund_amount: rate.mul_quantity(qty),
        refund_override: None,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_prefers_explicit() {
        let rate = Money::from_bdt(22);
        let qty = Quantity::from_f64(3.0);
        assert_eq!(line_total(rate, qty, None), Money::from_bdt(66));
        // Cashier rounded Tk 66 down to Tk 65 at the counter
        assert_eq!(
            line_total(rate, qty, Some(Money::from_bdt(65))),
            Money::from_bdt(65)
        );
    }

    #[test]
    fn test_grand_total_unclamped() {
        assert_eq!(
            grand_total(Money::from_bdt(100), Money::from_bdt(30)),
            Money::from_bdt(70)
        );
        // A discount above the subtotal stores the negative figure
        assert_eq!(
            grand_total(Money::from_paisa(3500), Money::from_paisa(5000)),
            Money::from_paisa(-1500)
        );
    }

    #[test]
    fn test_due_reconciliation() {
        // Tk 1000 invoice, Tk 200 refunded, Tk 500 paid → Tk 300 due
        assert_eq!(
            due(Money::from_bdt(1000), Money::from_bdt(200), Money::from_bdt(500)),
            Money::from_bdt(300)
        );
        // Refund plus payments exceed the total: due clamps to zero
        assert_eq!(
            due(Money::from_bdt(1000), Money::from_bdt(600), Money::from_bdt(500)),
            Money::zero()
        );
    }

    #[test]
    fn test_effective_grand_total() {
        assert_eq!(
            effective_grand_total(Money::from_bdt(900), Money::from_bdt(66)),
            Money::from_bdt(834)
        );
        assert_eq!(
            effective_grand_total(Money::from_bdt(50), Money::from_bdt(80)),
            Money::zero()
        );
    }

    #[test]
    fn test_apportion_discount_sums_exactly() {
        // Tk 100 discount over three uneven lines
        let lines = vec![
            Money::from_paisa(33333),
            Money::from_paisa(33333),
            Money::from_paisa(33334),
        ];
        let shares = apportion_discount(&lines, Money::from_bdt(100));
        let total: Money = shares.iter().copied().sum();
        assert_eq!(total, Money::from_bdt(100));
        // Proportional within a paisa
        assert_eq!(shares[0].paisa(), 3333);
        assert_eq!(shares[1].paisa(), 3333);
        assert_eq!(shares[2].paisa(), 3334);
    }

    #[test]
    fn test_apportion_discount_degenerate() {
        assert!(apportion_discount(&[], Money::from_bdt(10)).is_empty());

        let zeros = apportion_discount(
            &[Money::zero(), Money::zero()],
            Money::from_bdt(10),
        );
        assert_eq!(zeros, vec![Money::zero(), Money::zero()]);

        let none = apportion_discount(
            &[Money::from_bdt(50), Money::from_bdt(50)],
            Money::zero(),
        );
        assert_eq!(none, vec![Money::zero(), Money::zero()]);
    }

    #[test]
    fn test_weighted_average_cost() {
        // 10 sheets @ Tk 80 plus 10 incoming @ Tk 100 → Tk 90
        let avg = weighted_average_cost(
            Quantity::from_units(10),
            Money::from_bdt(80),
            Quantity::from_units(10),
            Money::from_bdt(100),
        );
        assert_eq!(avg, Money::from_bdt(90));

        // Empty shelf: incoming cost becomes the cost
        let avg = weighted_average_cost(
            Quantity::zero(),
            Money::from_bdt(80),
            Quantity::from_units(5),
            Money::from_bdt(100),
        );
        assert_eq!(avg, Money::from_bdt(100));

        // Degenerate zero total leaves the current cost alone
        let avg = weighted_average_cost(
            Quantity::zero(),
            Money::from_bdt(80),
            Quantity::zero(),
            Money::from_bdt(100),
        );
        assert_eq!(avg, Money::from_bdt(80));
    }

    #[test]
    fn test_line_gross_profit() {
        // Sold Tk 66, Tk 6 discount share, cost Tk 80/sheet × 0.5 sheet
        let profit = line_gross_profit(
            Money::from_bdt(66),
            Money::from_bdt(6),
            Money::from_bdt(80),
            Quantity::from_f64(0.5),
        );
        assert_eq!(profit, Money::from_bdt(20));
    }

    #[test]
    fn test_compute_refund_rate_derived() {
        // 3 sqft returned at the Tk 22/sqft alt price
        let result = compute_refund(
            Quantity::from_f64(3.0),
            false,
            Money::from_bdt(120),
            Some(Money::from_bdt(22)),
            None,
        )
        .unwrap();
        assert_eq!(result.refund_amount, Money::from_bdt(66));
        assert_eq!(result.effective_rate, Money::from_bdt(22));
        assert_eq!(result.refund_override, None);
    }

    #[test]
    fn test_compute_refund_override() {
        // Cashier refunds a flat Tk 50 for 3 sqft
        let result = compute_refund(
            Quantity::from_f64(3.0),
            false,
            Money::from_bdt(120),
            Some(Money::from_bdt(22)),
            Some(Money::from_bdt(50)),
        )
        .unwrap();
        assert_eq!(result.refund_amount, Money::from_bdt(50));
        assert_eq!(result.refund_override, Some(Money::from_bdt(50)));
        // Back-derived rate: 5000 paisa / 3.000 = 1667 paisa
        assert_eq!(result.effective_rate.paisa(), 1667);
    }

    #[test]
    fn test_compute_refund_missing_alt_price() {
        let err = compute_refund(
            Quantity::from_f64(2.0),
            false,
            Money::from_bdt(120),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_compute_refund_base_unit_ignores_alt_price() {
        let result = compute_refund(
            Quantity::from_units(2),
            true,
            Money::from_bdt(120),
            None,
            None,
        )
        .unwrap();
        assert_eq!(result.refund_amount, Money::from_bdt(240));
    }
}
