//! Evidence primitives: Shannon entropy and the context checksum.
//!
//! Both are pure functions with no error path. Entropy degenerates to 0.0
//! on empty input; the checksum is an integrity tripwire, not a
//! cryptographic hash — it must change if any governed field changes.

use crate::token::MemoryToken;

/// Fixed-point scale for stored entropy signatures (micro-bits per byte).
pub const ENTROPY_SCALE: f64 = 1_000_000.0;

/// Shannon entropy of a byte region, in bits per byte.
///
/// 256-bucket frequency histogram, `-Σ p·log2(p)` over non-empty buckets.
/// Deterministic; `0.0` for an empty region.
pub fn shannon_entropy(region: &[u8]) -> f64 {
    if region.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in region {
        counts[byte as usize] += 1;
    }

    let len = region.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Encode an entropy measurement into its stored fixed-point signature.
pub fn entropy_signature(entropy: f64) -> u64 {
    (entropy * ENTROPY_SCALE) as u64
}

/// Decode a stored signature back to bits per byte.
pub fn signature_entropy(signature: u64) -> f64 {
    signature as f64 / ENTROPY_SCALE
}

/// Non-cryptographic fingerprint of the governed region (FNV-1a, 64-bit).
///
/// Stage 1 requires a present fingerprint; cryptographic sealing of the
/// artifact stays with the external signer.
pub fn memory_hash(region: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for &byte in region {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Composite integrity value over a token's governed fields.
///
/// `memory_hash XOR entropy_signature XOR (stage_level << 32) XOR
/// allocated_bytes`. Recomputed at every verification and compared against
/// the stored value; a mismatch is always a hard failure.
pub fn context_checksum(token: &MemoryToken<'_>) -> u64 {
    token.memory_hash
        ^ token.entropy_signature
        ^ (u64::from(token.stage_level.level()) << 32)
        ^ token.allocated_bytes() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StageLevel;
    use chrono::Utc;
    use proptest::prelude::*;

    fn token_over(region: &[u8]) -> MemoryToken<'_> {
        MemoryToken {
            token_id: 1,
            stage_level: StageLevel::Basic,
            memory_hash: memory_hash(region),
            entropy_signature: entropy_signature(shannon_entropy(region)),
            context_checksum: 0,
            governance_flags: 0,
            region,
            stage_signature: String::new(),
            anti_reversion_lock: false,
            timestamp_created: Utc::now(),
            timestamp_last_verified: None,
        }
    }

    #[test]
    fn empty_region_has_zero_entropy() {
        assert_eq!(shannon_entropy(&[]), 0.0);
    }

    #[test]
    fn uniform_region_has_zero_entropy() {
        assert_eq!(shannon_entropy(&[0xAA; 512]), 0.0);
    }

    #[test]
    fn full_byte_alphabet_has_maximal_entropy() {
        let region: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        let entropy = shannon_entropy(&region);
        assert!((entropy - 8.0).abs() < 1e-9);
    }

    #[test]
    fn two_symbol_region_has_one_bit_entropy() {
        let region: Vec<u8> = [0u8, 1u8].iter().cycle().take(256).copied().collect();
        let entropy = shannon_entropy(&region);
        assert!((entropy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn signature_encoding_round_trips_within_scale() {
        let entropy = shannon_entropy(b"some moderately varied input bytes");
        let decoded = signature_entropy(entropy_signature(entropy));
        assert!((entropy - decoded).abs() < 1.0 / ENTROPY_SCALE * 2.0);
    }

    #[test]
    fn checksum_is_idempotent_on_unmodified_token() {
        let region = [7u8; 64];
        let token = token_over(&region);
        assert_eq!(context_checksum(&token), context_checksum(&token));
    }

    #[test]
    fn checksum_changes_with_stage_level() {
        let region = [7u8; 64];
        let mut token = token_over(&region);
        let before = context_checksum(&token);
        token.stage_level = StageLevel::Minimized;
        assert_ne!(context_checksum(&token), before);
    }

    #[test]
    fn checksum_changes_with_entropy_signature() {
        let region = [7u8; 64];
        let mut token = token_over(&region);
        let before = context_checksum(&token);
        token.entropy_signature ^= 1;
        assert_ne!(context_checksum(&token), before);
    }

    #[test]
    fn memory_hash_of_empty_region_is_nonzero() {
        // FNV-1a offset basis; stage-1's "hash present" gate relies on this
        // never colliding with the unset sentinel.
        assert_ne!(memory_hash(&[]), 0);
    }

    proptest! {
        #[test]
        fn entropy_is_deterministic(region in proptest::collection::vec(any::<u8>(), 0..2048)) {
            prop_assert_eq!(
                shannon_entropy(&region).to_bits(),
                shannon_entropy(&region).to_bits()
            );
        }

        #[test]
        fn entropy_is_bounded(region in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let entropy = shannon_entropy(&region);
            prop_assert!(entropy >= 0.0);
            prop_assert!(entropy <= 8.0 + 1e-9);
        }

        #[test]
        fn checksum_tracks_hash_changes(
            region in proptest::collection::vec(any::<u8>(), 1..256),
            flip in any::<u64>().prop_filter("nonzero", |&bit| bit != 0),
        ) {
            let mut token = token_over(&region);
            let before = context_checksum(&token);
            token.memory_hash ^= flip;
            prop_assert_ne!(context_checksum(&token), before);
        }
    }
}
