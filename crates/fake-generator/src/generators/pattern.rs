//! Strings matching a regular expression.
//!
//! Generation is delegated to proptest's regex strategy, driven by a ChaCha
//! runner seeded from the caller's RNG so results stay reproducible.

use crate::generator::FakeError;
use proptest::strategy::{Strategy, ValueTree};
use proptest::string::string_regex;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use rand::Rng;

/// Generate a string matching `pattern`.
///
/// Leading `^` and trailing `$` anchors are dropped; the generated value
/// always spans the whole match.
pub fn generate_matching<R: Rng>(pattern: &str, rng: &mut R) -> Result<String, FakeError> {
    let unsupported = |reason: String| FakeError::UnsupportedPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let strategy = string_regex(strip_anchors(pattern)).map_err(|e| unsupported(e.to_string()))?;

    let mut seed = [0u8; 32];
    rng.fill(&mut seed);
    let mut runner = TestRunner::new_with_rng(
        Config::default(),
        TestRng::from_seed(RngAlgorithm::ChaCha, &seed),
    );

    let tree = strategy
        .new_tree(&mut runner)
        .map_err(|reason| unsupported(reason.to_string()))?;

    Ok(tree.current())
}

fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_digits() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let value = generate_matching("[0-9]{6}", &mut rng).unwrap();
            assert_eq!(value.len(), 6);
            assert!(value.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_anchored_pattern() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = generate_matching("^pet-[a-z]{3}$", &mut rng).unwrap();

        assert!(value.starts_with("pet-"));
        assert_eq!(value.len(), 7);
        assert!(value[4..].chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_escaped_dollar_kept() {
        assert_eq!(strip_anchors("^price\\$"), "price\\$");
        assert_eq!(strip_anchors("abc$"), "abc");
    }

    #[test]
    fn test_invalid_pattern() {
        let mut rng = StdRng::seed_from_u64(42);
        let result = generate_matching("([a-z]", &mut rng);
        assert!(matches!(result, Err(FakeError::UnsupportedPattern { .. })));
    }

    #[test]
    fn test_deterministic_generation() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        assert_eq!(
            generate_matching("[A-Z]{2}[0-9]{4}", &mut rng1).unwrap(),
            generate_matching("[A-Z]{2}[0-9]{4}", &mut rng2).unwrap()
        );
    }
}
