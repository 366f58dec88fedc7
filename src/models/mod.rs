pub mod common;
pub mod document;
pub mod invoice;
pub mod payment;
pub mod share;

pub use common::*;
pub use document::*;
pub use invoice::*;
pub use payment::*;
pub use share::*;
