//! Minimal multi-asset balance/allowance ledger.
//!
//! Backs the standards-compliance probe: mint, approve (set-not-add) and
//! transfer-from with atomic three-way settlement. Entries are created by
//! mint and never deleted - a zero balance is a valid terminal state.

use indexmap::IndexMap;
use primitive_types::U256;

use crate::error::LedgerError;
use crate::types::{Address, AssetId};

/// In-memory multi-asset ledger keyed by `(holder, asset)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: IndexMap<(Address, AssetId), U256>,
    allowances: IndexMap<(Address, Address, AssetId), U256>,
}

impl TokenLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `holder` in `asset`. Unknown entries read as zero.
    pub fn balance_of(&self, holder: &Address, asset: &AssetId) -> U256 {
        self.balances
            .get(&(*holder, *asset))
            .copied()
            .unwrap_or_default()
    }

    /// Remaining allowance granted by `owner` to `spender` for `asset`.
    pub fn allowance(&self, owner: &Address, spender: &Address, asset: &AssetId) -> U256 {
        self.allowances
            .get(&(*owner, *spender, *asset))
            .copied()
            .unwrap_or_default()
    }

    /// Credit `amount` of `asset` to `holder`. No prior state required.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overflow`] if the balance would exceed `U256::MAX`.
    pub fn mint(
        &mut self,
        holder: Address,
        asset: AssetId,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(&holder, &asset);
        let new = have.checked_add(amount).ok_or(LedgerError::Overflow)?;
        log::trace!("mint: {amount} of asset {asset} to {holder}");
        self.balances.insert((holder, asset), new);
        Ok(())
    }

    /// Set (not add) the allowance of `spender` over `owner`'s `asset`.
    /// Overwrites any prior value.
    pub fn approve(&mut self, owner: Address, spender: Address, asset: AssetId, amount: U256) {
        self.allowances.insert((owner, spender, asset), amount);
    }

    /// Move `amount` of `asset` from `from` to `to` on behalf of `spender`.
    ///
    /// Balance decrement, allowance decrement and recipient credit are
    /// applied together or not at all - no partial transfer is observable.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] or
    /// [`LedgerError::InsufficientAllowance`] when the preconditions fail,
    /// [`LedgerError::Overflow`] if the recipient balance would overflow.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(&from, &asset);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { need: amount, have });
        }

        let allowed = self.allowance(&from, &spender, &asset);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                need: amount,
                have: allowed,
            });
        }

        // Stage every new value before writing anything so a failure above
        // (or the overflow below) leaves the ledger untouched
        let from_new = have - amount;
        let to_have = if from == to {
            from_new
        } else {
            self.balance_of(&to, &asset)
        };
        let to_new = to_have.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let allowed_new = allowed - amount;

        log::trace!("transfer_from: {amount} of asset {asset}, {from} -> {to} via {spender}");
        self.balances.insert((from, asset), from_new);
        self.balances.insert((to, asset), to_new);
        self.allowances.insert((from, spender, asset), allowed_new);
        Ok(())
    }
}
