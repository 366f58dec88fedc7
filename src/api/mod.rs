pub mod document_handler;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod share_handler;
pub mod state;

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub use error::{ApiError, ApiResult};
pub use routes::configure_routes;
pub use state::ApiState;

pub static PDF_RENDERS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("hippo_pdf_renders_total", "Invoice PDFs rendered")
        .expect("metric registration")
});

pub static SHARE_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hippo_share_resolutions_total",
        "Public share resolutions by outcome",
        &["outcome"]
    )
    .expect("metric registration")
});
