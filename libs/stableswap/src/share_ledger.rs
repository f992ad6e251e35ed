//! Pool-share ledger
//!
//! Fungible balances of the pool's share token (18 decimals). Only liquidity
//! accounting mints and burns; holders may move shares between each other.

use crate::error::{PoolError, Result};
use std::collections::HashMap;
use types::Address;

#[derive(Debug, Default, Clone)]
pub(crate) struct ShareLedger {
    balances: HashMap<Address, u128>,
    total_supply: u128,
}

impl ShareLedger {
    pub(crate) fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub(crate) fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Number of accounts with a non-zero balance
    #[cfg(test)]
    fn holders(&self) -> usize {
        self.balances.len()
    }

    /// Fail unless `holder` owns at least `amount`
    pub(crate) fn ensure_balance(&self, holder: &Address, amount: u128) -> Result<()> {
        let available = self.balance_of(holder);
        if available < amount {
            return Err(PoolError::InsufficientShares {
                requested: amount,
                available,
            });
        }
        Ok(())
    }

    pub(crate) fn mint(&mut self, to: Address, amount: u128) -> Result<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(PoolError::Overflow("share supply"))?;
        let balance = self.balance_of(&to) + amount; // bounded by supply
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub(crate) fn burn(&mut self, from: Address, amount: u128) -> Result<()> {
        self.ensure_balance(&from, amount)?;
        let remaining = self.balance_of(&from) - amount;
        self.set_balance(from, remaining);
        self.total_supply -= amount;
        Ok(())
    }

    pub(crate) fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        self.ensure_balance(&from, amount)?;
        if from == to {
            return Ok(());
        }
        let remaining = self.balance_of(&from) - amount;
        let credited = self.balance_of(&to) + amount;
        self.set_balance(from, remaining);
        self.set_balance(to, credited);
        Ok(())
    }

    fn set_balance(&mut self, holder: Address, balance: u128) {
        if balance == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, balance);
        }
    }
}
