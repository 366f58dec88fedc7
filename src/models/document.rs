use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Company, Customer, Invoice, InvoiceItem, InvoiceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyBlock {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

/// The normalized, renderer-ready value for one invoice. Built from
/// pre-fetched records only — no network or storage access happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub tax_type: String,
    pub tax_rate: f64,
    pub status: InvoiceStatus,
    pub company: PartyBlock,
    pub logo_url: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub customer: PartyBlock,
    pub items: Vec<DocumentLine>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub notes: Option<String>,
}

impl InvoiceDocument {
    pub fn build(
        invoice: &Invoice,
        items: &[InvoiceItem],
        company: &Company,
        customer: &Customer,
    ) -> Self {
        InvoiceDocument {
            invoice_number: invoice.invoice_number.clone(),
            date: invoice.date,
            due_date: invoice.due_date,
            currency: invoice.currency.clone(),
            tax_type: invoice.tax_type.clone(),
            tax_rate: invoice.tax_rate,
            status: invoice.status,
            company: PartyBlock {
                name: company.name.clone(),
                address: company.address.clone(),
                email: company.email.clone(),
                phone: company.phone.clone(),
            },
            logo_url: company.logo_url.clone(),
            bank_name: company.bank_name.clone(),
            bank_account: company.bank_account.clone(),
            customer: PartyBlock {
                name: customer.name.clone(),
                address: customer.address.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
            items: items
                .iter()
                .map(|item| DocumentLine {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    amount: item.amount,
                })
                .collect(),
            subtotal: invoice.subtotal,
            tax_amount: invoice.tax_amount,
            total: invoice.total,
            notes: invoice.notes.clone(),
        }
    }

    /// Uppercase first letter of the company name, for the avatar fallback.
    pub fn company_initial(&self) -> char {
        self.company
            .name
            .chars()
            .find(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }

    pub fn file_name(&self) -> String {
        format!("invoice-{}.pdf", self.invoice_number)
    }

    /// Text for the external share action.
    pub fn share_message(&self) -> String {
        format!(
            "Invoice #{} from {}\n\nAmount: ${:.2}\nDue Date: {}",
            self.invoice_number, self.company.name, self.total, self.due_date
        )
    }

    /// Message-compose fallback when no native share capability exists.
    pub fn compose_url(&self) -> String {
        match reqwest::Url::parse_with_params(
            "https://wa.me/",
            &[("text", self.share_message())],
        ) {
            Ok(url) => url.to_string(),
            Err(_) => "https://wa.me/".to_string(),
        }
    }
}
