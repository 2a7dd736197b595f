//! Base types shared across the prober.

use serde::{Deserialize, Serialize};

pub use primitive_types::{H160, H256, U256};

/// Account address on the target environment (20 bytes, EVM layout).
pub type Address = H160;

/// Asset identifier inside the multi-asset ledger.
///
/// The target environments we probe address assets by a full 256-bit id
/// rather than by contract address, so balances and allowances are keyed
/// by `(Address, AssetId)`.
pub type AssetId = U256;

/// Identity of a pool in the environment's pool registry.
///
/// Asset ids are expected in canonical order (`asset0 < asset1`); the
/// registry rejects duplicates of the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    /// Lower-ordered asset of the pair
    pub asset0: AssetId,
    /// Higher-ordered asset of the pair
    pub asset1: AssetId,
    /// Fee setting in hundredths of a basis point
    pub fee: u32,
}

impl PoolKey {
    /// Build a pool key, swapping the assets into canonical order if needed.
    pub fn new(a: AssetId, b: AssetId, fee: u32) -> Self {
        let (asset0, asset1) = if a <= b { (a, b) } else { (b, a) };
        Self { asset0, asset1, fee }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_key_canonical_order() {
        let a = U256::from(7u64);
        let b = U256::from(3u64);

        let key = PoolKey::new(a, b, 500);
        assert_eq!(key.asset0, b);
        assert_eq!(key.asset1, a);
        assert_eq!(key, PoolKey::new(b, a, 500));
    }
}
