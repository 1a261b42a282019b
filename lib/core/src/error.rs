//! Error handling foundation for the flowdeck platform.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in their own
//! error modules, using rootcause's `.context()` to add layer-appropriate
//! context as errors propagate up the stack.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn domain_errors_convert_through_question_mark() {
        fn parse_port(s: &str) -> Result<u16, std::num::ParseIntError> {
            Ok(s.parse::<u16>()?)
        }

        assert_eq!(parse_port("8080").expect("valid port"), 8080);
        assert!(parse_port("not-a-port").is_err());
    }
}
