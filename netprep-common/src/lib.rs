//! Common vocabulary for the netprep toolkit
//!
//! The closed county enumeration, its numbering constants, and the error type
//! shared by every stage that needs to name a region.

pub mod county;
pub mod error;

pub use county::County;
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use crate::county::suggest_correction;

    #[test]
    fn suggest_correction_returns_expected_county() {
        assert_eq!(
            suggest_correction("Contra Cota"),
            Some("Contra Costa".to_string())
        );
    }
}
