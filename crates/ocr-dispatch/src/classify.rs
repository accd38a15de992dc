//! Provider error-code classification
//!
//! The provider signals rate limiting with a small fixed set of codes:
//! 17 (daily request limit), 18 (QPS/concurrency limit), 19 (total request
//! limit). Those are local to one (mode, account) pair, so the chain moves
//! on. Every other code (malformed image, invalid credential, ...) is a
//! defect that no other pair can fix, so the chain aborts.

use provider::ErrorClass;

/// Classify a non-zero provider error code.
pub fn classify_code(code: i64) -> ErrorClass {
    match code {
        17 | 18 | 19 => ErrorClass::Retryable,
        _ => ErrorClass::NonRetryable,
    }
}

/// User-facing suggestion keyed by the (last) provider error code.
pub fn suggestion_for(code: Option<i64>) -> &'static str {
    match code {
        Some(17) | Some(19) => "daily quota exhausted, please try again tomorrow",
        Some(18) => "service is busy, please retry shortly",
        _ => "recognition failed, please retry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_codes_are_retryable() {
        assert_eq!(classify_code(17), ErrorClass::Retryable);
        assert_eq!(classify_code(18), ErrorClass::Retryable);
        assert_eq!(classify_code(19), ErrorClass::Retryable);
    }

    #[test]
    fn other_codes_abort_the_chain() {
        // 216201 = image format error, 110 = invalid token, plus the
        // synthetic negatives must all be non-retryable.
        for code in [1, 6, 110, 216201, 21, -1] {
            assert_eq!(classify_code(code), ErrorClass::NonRetryable, "code {code}");
        }
    }

    #[test]
    fn daily_and_total_quota_suggest_waiting() {
        assert_eq!(
            suggestion_for(Some(17)),
            "daily quota exhausted, please try again tomorrow"
        );
        assert_eq!(suggestion_for(Some(19)), suggestion_for(Some(17)));
    }

    #[test]
    fn concurrency_limit_suggests_short_retry() {
        assert_eq!(suggestion_for(Some(18)), "service is busy, please retry shortly");
    }

    #[test]
    fn unknown_or_absent_code_suggests_generic_retry() {
        assert_eq!(suggestion_for(Some(21)), "recognition failed, please retry");
        assert_eq!(suggestion_for(None), "recognition failed, please retry");
    }
}
