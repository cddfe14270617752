//! Ephemeral endpoint identifiers and the capabilities used to mint them.
//!
//! Randomness and time are injected through [`RandomSource`] and
//! [`MonotonicClock`] so callers can substitute deterministic sources.

use std::fmt;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::Serialize;
use thiserror::Error;

/// Number of characters in an [`EndpointId`].
pub const ENDPOINT_ID_LENGTH: usize = 4;

const ENDPOINT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Bytes at or above this value would skew the modulo mapping and are
/// discarded.
const UNBIASED_BYTE_LIMIT: usize = 256 / ENDPOINT_ID_ALPHABET.len() * ENDPOINT_ID_ALPHABET.len();

/// Draws attempted before the random source is considered broken.
const MAX_DRAWS: usize = 8;

/// Failures while minting an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The random-byte source could not produce bytes.
    #[error("Random source failed: {0}")]
    RandomSourceFailed(String),

    /// An endpoint id string has the wrong shape.
    #[error("Invalid endpoint id: '{0}'. Expected 4 characters from A-Z and 0-9.")]
    InvalidEndpointId(String),
}

/// A source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `dest` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::RandomSourceFailed`] if the source is
    /// exhausted or unavailable. Partially filled buffers must not be used.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), IdentityError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), IdentityError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| IdentityError::RandomSourceFailed(e.to_string()))
    }
}

/// A monotonic clock measuring elapsed real time.
pub trait MonotonicClock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin. Never decreases.
    fn elapsed_realtime(&self) -> Duration;
}

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Elapsed time since the clock was first read in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn elapsed_realtime(&self) -> Duration {
        PROCESS_START.elapsed()
    }
}

/// Ephemeral identifier for one advertised or discovered device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Draws a fresh endpoint id from `random`.
    ///
    /// Every character is uniform over `A-Z0-9`: bytes that would bias the
    /// mapping are dropped and more bytes are drawn.
    ///
    /// # Errors
    ///
    /// Propagates [`IdentityError::RandomSourceFailed`]; no id is produced
    /// from a failed draw. Also fails if the source keeps producing only
    /// discarded bytes.
    pub fn generate<R: RandomSource + ?Sized>(random: &R) -> Result<Self, IdentityError> {
        let mut id = String::with_capacity(ENDPOINT_ID_LENGTH);
        let mut bytes = [0u8; ENDPOINT_ID_LENGTH];
        for _ in 0..MAX_DRAWS {
            random.fill_bytes(&mut bytes)?;
            for byte in bytes.iter().map(|b| usize::from(*b)) {
                if byte >= UNBIASED_BYTE_LIMIT {
                    continue;
                }
                id.push(char::from(
                    ENDPOINT_ID_ALPHABET[byte % ENDPOINT_ID_ALPHABET.len()],
                ));
                if id.len() == ENDPOINT_ID_LENGTH {
                    return Ok(Self(id));
                }
            }
        }
        Err(IdentityError::RandomSourceFailed(format!(
            "no unbiased bytes after {MAX_DRAWS} draws"
        )))
    }

    /// Validates an endpoint id received from elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidEndpointId`] on a malformed id.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let valid = s.len() == ENDPOINT_ID_LENGTH
            && s.bytes().all(|b| ENDPOINT_ID_ALPHABET.contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentityError::InvalidEndpointId(s.to_string()))
        }
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FixedRandom(Vec<u8>);

    impl RandomSource for FixedRandom {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), IdentityError> {
            for (i, byte) in dest.iter_mut().enumerate() {
                *byte = self.0[i % self.0.len()];
            }
            Ok(())
        }
    }

    struct ExhaustedRandom;

    impl RandomSource for ExhaustedRandom {
        fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), IdentityError> {
            Err(IdentityError::RandomSourceFailed("entropy pool exhausted".into()))
        }
    }

    #[test]
    fn test_generate_maps_bytes_onto_alphabet() {
        let id = EndpointId::generate(&FixedRandom(vec![0, 25, 26, 35])).unwrap();
        assert_eq!(id.as_str(), "AZ09");
    }

    #[test]
    fn test_generate_wraps_large_bytes() {
        let id = EndpointId::generate(&FixedRandom(vec![36, 37, 251, 71])).unwrap();
        assert_eq!(id.as_str(), "AB99");
    }

    #[test]
    fn test_generate_skips_biased_bytes() {
        // 252..=255 would map onto A-D a second time.
        let id = EndpointId::generate(&FixedRandom(vec![36, 37, 255, 71])).unwrap();
        assert_eq!(id.as_str(), "AB9A");
    }

    #[test]
    fn test_generate_gives_up_on_degenerate_source() {
        let err = EndpointId::generate(&FixedRandom(vec![252, 253, 254, 255])).unwrap_err();
        assert!(matches!(err, IdentityError::RandomSourceFailed(_)));
    }

    #[test]
    fn test_generate_propagates_random_failure() {
        let err = EndpointId::generate(&ExhaustedRandom).unwrap_err();
        assert!(matches!(err, IdentityError::RandomSourceFailed(_)));
    }

    #[test]
    fn test_os_random_ids_have_fixed_length() {
        let id = EndpointId::generate(&OsRandom).unwrap();
        assert_eq!(id.as_str().len(), ENDPOINT_ID_LENGTH);
        assert!(EndpointId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(EndpointId::parse("ABC").is_err());
        assert!(EndpointId::parse("abcd").is_err());
        assert!(EndpointId::parse("AB-D").is_err());
        assert!(EndpointId::parse("AB12").is_ok());
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let first = clock.elapsed_realtime();
        let second = clock.elapsed_realtime();
        assert!(second >= first);
    }

    #[test]
    fn test_random_source_is_object_safe() {
        let calls = Mutex::new(0);
        struct Counting<'a>(&'a Mutex<u32>);
        impl RandomSource for Counting<'_> {
            fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), IdentityError> {
                *self.0.lock().unwrap() += 1;
                dest.fill(7);
                Ok(())
            }
        }
        let source: &dyn RandomSource = &Counting(&calls);
        let id = EndpointId::generate(source).unwrap();
        assert_eq!(id.as_str(), "HHHH");
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
