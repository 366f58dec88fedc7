pub mod capture;
pub mod html;
pub mod layout;
pub mod logo;
pub mod pdf;

pub use capture::build_capture_pdf;
pub use html::{render_error_page, render_preview};
pub use logo::{prepare_logo, PreparedLogo};
pub use pdf::render_pdf;
