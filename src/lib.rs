pub mod api;
pub mod auth;
pub mod core;
pub mod models;
pub mod render;
pub mod storage;

// Re-export commonly used types
pub use models::{
    calculate_totals, Company, Customer, Invoice, InvoiceDocument, InvoiceItem, InvoiceShare,
    InvoiceStatus, PaymentRecord,
};

pub use api::{configure_routes, ApiState};
pub use storage::{DataStore, SqliteStore};
