use rust_decimal::{Decimal, RoundingStrategy};

use crate::sources::models::Payment;

/// Currency precision for every derived amount
pub const CURRENCY_SCALE: u32 = 2;

/// Round half away from zero to cents and pin the scale at two places
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Sum of every payment attributed to a plan, rounded once after summation
pub fn sum_payments<'a, I>(payments: I) -> Decimal
where
    I: IntoIterator<Item = &'a Payment>,
{
    let total: Decimal = payments.into_iter().map(|p| p.amount).sum();
    round_currency(total)
}

/// Amount the remaining balance is measured from.
///
/// The plan target wins unless it is missing or non-positive, in which case
/// the debt's own amount is used.
pub fn starting_amount(debt_amount: Decimal, plan_target: Option<Decimal>) -> Decimal {
    match plan_target {
        Some(target) if target > Decimal::ZERO => target,
        _ => debt_amount,
    }
}

/// Remaining balance of a debt after every attributed payment
pub fn remaining_amount<'a, I>(debt_amount: Decimal, plan_target: Option<Decimal>, payments: I) -> Decimal
where
    I: IntoIterator<Item = &'a Payment>,
{
    let paid = sum_payments(payments);
    round_currency(starting_amount(debt_amount, plan_target) - paid)
}

/// Zero or negative counts as paid off; overpayment included
pub fn is_paid_off(remaining: Decimal) -> bool {
    remaining <= Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn payments(amounts: &[Decimal]) -> Vec<Payment> {
        amounts
            .iter()
            .map(|amount| Payment {
                amount: *amount,
                date: NaiveDate::from_ymd_opt(2020, 3, 14).unwrap(),
                payment_plan_id: 1,
            })
            .collect()
    }

    #[test]
    fn test_no_plan_uses_debt_amount() {
        let none: Vec<Payment> = Vec::new();
        let remaining = remaining_amount(dec!(1500000.00), None, &none);

        assert_eq!(remaining, dec!(1500000.00));
        assert_eq!(remaining.to_string(), "1500000.00");
        assert!(!is_paid_off(remaining));
    }

    #[test]
    fn test_plan_target_takes_precedence_over_debt_amount() {
        let none: Vec<Payment> = Vec::new();
        let remaining = remaining_amount(dec!(1500000), Some(dec!(1000000)), &none);
        assert_eq!(remaining, dec!(1000000));
    }

    #[test]
    fn test_zero_plan_target_falls_back_to_debt_amount() {
        let paid = payments(&[dec!(50.00)]);
        assert_eq!(remaining_amount(dec!(1234.00), Some(dec!(0.00)), &paid), dec!(1184.00));

        let paid = payments(&[dec!(100.00)]);
        let remaining = remaining_amount(dec!(100.00), Some(dec!(0)), &paid);
        assert_eq!(remaining, dec!(0.00));
        assert!(is_paid_off(remaining));
    }

    #[test]
    fn test_zero_target_on_zero_debt_goes_negative() {
        let paid = payments(&[dec!(100.00)]);
        let remaining = remaining_amount(dec!(0.0), Some(dec!(0.00)), &paid);

        assert_eq!(remaining, dec!(-100.00));
        assert_eq!(remaining.to_string(), "-100.00");
        assert!(is_paid_off(remaining));
    }

    #[test]
    fn test_many_small_payments_stay_exact() {
        let paid = payments(&[dec!(5.28); 15]);

        assert_eq!(sum_payments(&paid), dec!(79.20));
        assert_eq!(remaining_amount(dec!(123.46), Some(dec!(123.46)), &paid), dec!(44.26));
    }

    #[test]
    fn test_rounding_happens_after_summation() {
        // Rounding each term first would give 0.00
        let paid = payments(&[dec!(0.004), dec!(0.004), dec!(0.004)]);
        assert_eq!(sum_payments(&paid), dec!(0.01));

        let paid = payments(&[dec!(0.005)]);
        assert_eq!(sum_payments(&paid), dec!(0.01));
    }

    #[test]
    fn test_paid_off_boundary() {
        assert!(is_paid_off(dec!(0)));
        assert!(is_paid_off(dec!(-0.01)));
        assert!(!is_paid_off(dec!(0.01)));
    }
}
