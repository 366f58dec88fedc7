use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{HippoError, HippoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    Other,
}

/// One entry in an invoice's payment ledger. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub invoice_id: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_remarks: Option<String>,
}

impl NewPayment {
    pub fn validate(&self) -> HippoResult<()> {
        if self.amount <= 0.0 {
            return Err(HippoError::validation("payment amount must be positive"));
        }
        Ok(())
    }
}

pub fn total_paid(payments: &[PaymentRecord]) -> f64 {
    payments.iter().map(|p| p.amount).sum()
}

/// The ledger settles the invoice once cumulative payments reach the total.
pub fn settles(paid: f64, invoice_total: f64) -> bool {
    paid >= invoice_total
}

/// Remaining amount owed, floored at zero for display.
pub fn balance_due(invoice_total: f64, paid: f64) -> f64 {
    (invoice_total - paid).max(0.0)
}
