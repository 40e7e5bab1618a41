pub mod converter;
pub mod errors;
pub mod request;

pub use converter::{BatchConverter, BatchReport, ConversionFailure, ConvertedFile};
pub use errors::FrontendError;
pub use request::ConversionRequest;
