//! Error handling foundation for taskhook.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums next to the code that raises them and lets rootcause carry them
//! up the stack as a `Report`.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[derive(Debug)]
    struct Unavailable;

    impl std::fmt::Display for Unavailable {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("store unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    fn load() -> Result<u8, Unavailable> {
        let raw: std::result::Result<u8, Unavailable> = Err(Unavailable);
        Ok(raw?)
    }

    #[test]
    fn domain_errors_convert_with_question_mark() {
        let report = load().expect_err("should fail");
        assert!(report.to_string().contains("store unavailable"));
    }
}
