use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{HippoError, HippoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub company_id: String,
    pub customer_id: String,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    // Older invoices predate the tax fields; they deserialize with these
    // defaults instead of being migrated.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_tax_type")]
    pub tax_type: String,
    #[serde(default)]
    pub tax_rate: f64,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_tax_type() -> String {
    "VAT".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub company_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub tax_type: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Derives the three totals from the line items and a percentage tax rate.
/// Totals keep full precision; rounding happens only at render time.
pub fn calculate_totals(items: &[NewInvoiceItem], tax_rate: f64) -> InvoiceTotals {
    let subtotal: f64 = items
        .iter()
        .map(|item| item.quantity * item.unit_price)
        .sum();
    let tax_amount = subtotal * tax_rate / 100.0;
    InvoiceTotals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

impl NewInvoice {
    /// Rejects the request before anything is persisted or computed.
    pub fn validate(&self) -> HippoResult<()> {
        if self.customer_id.trim().is_empty() {
            return Err(HippoError::validation("customer_id is required"));
        }
        if self.items.is_empty() {
            return Err(HippoError::validation(
                "an invoice needs at least one line item",
            ));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(HippoError::validation(format!(
                    "item {} is missing a description",
                    i + 1
                )));
            }
            if item.quantity <= 0.0 {
                return Err(HippoError::validation(format!(
                    "item {} must have a positive quantity",
                    i + 1
                )));
            }
            if item.unit_price <= 0.0 {
                return Err(HippoError::validation(format!(
                    "item {} must have a positive unit price",
                    i + 1
                )));
            }
        }
        if let Some(rate) = self.tax_rate {
            if !(0.0..=100.0).contains(&rate) {
                return Err(HippoError::validation("tax_rate must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

pub fn generate_invoice_number() -> String {
    format!("INV-{}", Utc::now().timestamp_millis())
}
