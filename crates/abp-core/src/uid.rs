//! Human-readable identifier generation.

use rand::Rng;

/// Generate a "BUID-" identifier with a random 6-digit suffix.
///
/// Collisions are possible; the storage layer carries a unique constraint on
/// the column and the caller must treat a constraint violation as a retryable
/// conflict rather than assume uniqueness from generation alone.
pub fn generate_beneficiary_uid() -> String {
    let number: u32 = rand::rng().random_range(100_000..1_000_000);
    format!("BUID-{}", number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_has_expected_shape() {
        let uid = generate_beneficiary_uid();
        assert!(uid.starts_with("BUID-"));
        let digits = &uid["BUID-".len()..];
        assert_eq!(digits.len(), 6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn uid_never_has_leading_zero() {
        for _ in 0..100 {
            let uid = generate_beneficiary_uid();
            assert!(!uid["BUID-".len()..].starts_with('0'));
        }
    }
}
