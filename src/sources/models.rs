use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three independently served collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Debts,
    PaymentPlans,
    Payments,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Debts => "debts",
            Collection::PaymentPlans => "payment_plans",
            Collection::Payments => "payments",
        }
    }

    /// Return all collections a snapshot is made of
    pub fn all() -> Vec<Collection> {
        vec![
            Collection::Debts,
            Collection::PaymentPlans,
            Collection::Payments,
        ]
    }
}

/// Debt as served by the debts endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,

    /// Informational only; the reconciled flag is derived from the plan
    #[serde(default)]
    pub is_in_payment_plan: bool,
}

/// Payment plan as served by the payment plans endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: i64,
    pub debt_id: i64,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount_to_pay: Decimal,

    /// Kept as served so an unknown cadence fails one plan, not the whole fetch
    pub installment_frequency: String,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub installment_amount: Decimal,

    pub start_date: NaiveDate,
}

/// Payment as served by the payments endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,

    pub date: NaiveDate,

    pub payment_plan_id: i64,
}

/// One fully fetched copy of all three collections
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub debts: Vec<Debt>,
    pub payment_plans: Vec<PaymentPlan>,
    pub payments: Vec<Payment>,
}

impl Snapshot {
    pub fn new(debts: Vec<Debt>, payment_plans: Vec<PaymentPlan>, payments: Vec<Payment>) -> Self {
        Self {
            debts,
            payment_plans,
            payments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debt_parses_exact_decimals() {
        let debts: Vec<Debt> = serde_json::from_str(
            r#"[{"id": 0, "amount": 123.46, "is_in_payment_plan": true}, {"id": 1, "amount": 4920.34}]"#,
        )
        .unwrap();

        assert_eq!(debts[0].amount, dec!(123.46));
        assert!(debts[0].is_in_payment_plan);
        assert_eq!(debts[1].amount, dec!(4920.34));
        assert!(!debts[1].is_in_payment_plan);
    }

    #[test]
    fn test_payment_plan_parses_dates_and_frequency() {
        let plans: Vec<PaymentPlan> = serde_json::from_str(
            r#"[{
                "id": 0,
                "debt_id": 0,
                "amount_to_pay": 102.50,
                "installment_frequency": "WEEKLY",
                "installment_amount": 51.25,
                "start_date": "2020-09-28"
            }]"#,
        )
        .unwrap();

        assert_eq!(plans[0].amount_to_pay, dec!(102.50));
        assert_eq!(plans[0].installment_frequency, "WEEKLY");
        assert_eq!(
            plans[0].start_date,
            NaiveDate::from_ymd_opt(2020, 9, 28).unwrap()
        );
    }

    #[test]
    fn test_payment_rejects_unparseable_date() {
        let result: Result<Vec<Payment>, _> = serde_json::from_str(
            r#"[{"amount": 51.25, "date": "09/29/2020", "payment_plan_id": 0}]"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_collection_names() {
        let names: Vec<&str> = Collection::all().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["debts", "payment_plans", "payments"]);
    }
}
