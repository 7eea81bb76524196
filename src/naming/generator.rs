//! Canonical identifier minting

use rand::Rng;

/// Prefix for canonical metric ids
pub const METRIC_ID_PREFIX: &str = "_m";
/// Prefix for canonical field ids
pub const FIELD_ID_PREFIX: &str = "_f";

/// Number of random hex characters in a minted id
const ID_HEX_LEN: usize = 8;

/// Mints collision-resistant opaque canonical identifiers.
///
/// Ids are a fixed prefix plus random lowercase hex, e.g. `_m3fa91c02`.
/// They are unique only within their owning registry at mint time: callers
/// check the target registry and re-mint on the (rare) collision.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameGenerator;

impl NameGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Mint a canonical metric id.
    pub fn metric_id(&self) -> String {
        Self::mint(METRIC_ID_PREFIX)
    }

    /// Mint a canonical field id.
    pub fn field_id(&self) -> String {
        Self::mint(FIELD_ID_PREFIX)
    }

    /// Mint an id that is not already present in `used`.
    ///
    /// Retries a bounded number of times; with 32 bits of randomness the
    /// retry loop only matters for adversarially full registries.
    pub fn unused_id<F>(&self, mint: F, used: &dyn Fn(&str) -> bool) -> Option<String>
    where
        F: Fn(&Self) -> String,
    {
        const MAX_ATTEMPTS: usize = 64;
        for _ in 0..MAX_ATTEMPTS {
            let candidate = mint(self);
            if !used(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn mint(prefix: &str) -> String {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(prefix.len() + ID_HEX_LEN);
        id.push_str(prefix);
        for _ in 0..ID_HEX_LEN {
            let nibble: u8 = rng.gen_range(0..16);
            id.push(char::from_digit(nibble as u32, 16).unwrap_or('0'));
        }
        id
    }
}
