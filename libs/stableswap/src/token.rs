//! Token interface consumed by the pool
//!
//! The pool never keeps token balances itself; it moves funds through a [`Token`]
//! implementation. Identity that a contract would read from the call context is
//! passed explicitly as `caller`/`spender`.

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use types::{Address, TokenAddress};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("{account} holds {balance} of token {token}, needs {needed}")]
    InsufficientBalance {
        token: TokenAddress,
        account: Address,
        balance: u128,
        needed: u128,
    },

    #[error("{spender} may spend {allowance} of {owner}'s token {token}, needs {needed}")]
    InsufficientAllowance {
        token: TokenAddress,
        owner: Address,
        spender: Address,
        allowance: u128,
        needed: u128,
    },

    #[error("Balance overflow on token {0}")]
    Overflow(TokenAddress),
}

/// Fungible token as seen by a pool
pub trait Token: Send + Sync {
    fn address(&self) -> TokenAddress;

    fn decimals(&self) -> u8;

    fn balance_of(&self, owner: &Address) -> u128;

    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Let `spender` move up to `amount` of `owner`'s balance
    fn approve(&self, owner: Address, spender: Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `caller` to `to`
    fn transfer(&self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` against `spender`'s allowance
    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;
}

#[derive(Debug, Default)]
struct Balances {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
}

impl Balances {
    fn move_balance(
        &mut self,
        token: TokenAddress,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let balance = self.balances.get(&from).copied().unwrap_or(0);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                token,
                account: from,
                balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balances.get(&to).copied().unwrap_or(0);
        let credited = to_balance
            .checked_add(amount)
            .ok_or(TokenError::Overflow(token))?;
        self.balances.insert(from, balance - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

/// Thread-safe in-memory ERC-20 style token
#[derive(Debug)]
pub struct InMemoryToken {
    address: TokenAddress,
    symbol: String,
    decimals: u8,
    state: RwLock<Balances>,
}

impl InMemoryToken {
    pub fn new(address: TokenAddress, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            state: RwLock::new(Balances::default()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> u128 {
        self.state.read().total_supply
    }

    /// Create `amount` new tokens for `to`
    pub fn mint(&self, to: Address, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.write();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow(self.address))?;
        let balance = state.balances.entry(to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(TokenError::Overflow(self.address))?;
        state.total_supply = supply;
        Ok(())
    }
}

impl Token for InMemoryToken {
    fn address(&self) -> TokenAddress {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.state.read().balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.state
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&self, owner: Address, spender: Address, amount: u128) -> Result<(), TokenError> {
        self.state.write().allowances.insert((owner, spender), amount);
        Ok(())
    }

    fn transfer(&self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.state
            .write()
            .move_balance(self.address, caller, to, amount)
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut state = self.state.write();
        let allowance = state
            .allowances
            .get(&(from, spender))
            .copied()
            .unwrap_or(0);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                token: self.address,
                owner: from,
                spender,
                allowance,
                needed: amount,
            });
        }
        state.move_balance(self.address, from, to, amount)?;
        if allowance != u128::MAX {
            state.allowances.insert((from, spender), allowance - amount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Counterparty -> pool
    Pull,
    /// Pool -> counterparty
    Push,
}

struct AppliedTransfer<'a> {
    token: &'a dyn Token,
    counterparty: Address,
    amount: u128,
    direction: Direction,
    /// Pool allowance before a pull, restored on rollback
    prior_allowance: Option<u128>,
}

/// Token movements of one pool operation, reversible until dropped
///
/// Pool operations run their transfers through a batch while holding the pool
/// lock. If any transfer fails, [`TransferBatch::rollback`] undoes the ones
/// already applied in reverse order before the error reaches the caller.
pub(crate) struct TransferBatch<'a> {
    pool: Address,
    applied: Vec<AppliedTransfer<'a>>,
}

impl<'a> TransferBatch<'a> {
    pub(crate) fn new(pool: Address) -> Self {
        Self {
            pool,
            applied: Vec::new(),
        }
    }

    /// Pull `amount` from `from` into the pool using the pool's allowance
    pub(crate) fn pull(
        &mut self,
        token: &'a dyn Token,
        from: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let prior_allowance = token.allowance(&from, &self.pool);
        token.transfer_from(self.pool, from, self.pool, amount)?;
        self.applied.push(AppliedTransfer {
            token,
            counterparty: from,
            amount,
            direction: Direction::Pull,
            prior_allowance: Some(prior_allowance),
        });
        Ok(())
    }

    /// Push `amount` from the pool to `to`
    pub(crate) fn push(
        &mut self,
        token: &'a dyn Token,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        token.transfer(self.pool, to, amount)?;
        self.applied.push(AppliedTransfer {
            token,
            counterparty: to,
            amount,
            direction: Direction::Push,
            prior_allowance: None,
        });
        Ok(())
    }

    /// Reverse every applied transfer, newest first
    pub(crate) fn rollback(self) {
        let pool = self.pool;
        for transfer in self.applied.into_iter().rev() {
            let result = match transfer.direction {
                Direction::Pull => transfer
                    .token
                    .transfer(pool, transfer.counterparty, transfer.amount)
                    .and_then(|()| match transfer.prior_allowance {
                        Some(allowance) => {
                            transfer
                                .token
                                .approve(transfer.counterparty, pool, allowance)
                        }
                        None => Ok(()),
                    }),
                Direction::Push => {
                    transfer
                        .token
                        .transfer(transfer.counterparty, pool, transfer.amount)
                }
            };
            match result {
                Ok(()) => warn!(
                    token = %transfer.token.address(),
                    counterparty = %transfer.counterparty,
                    amount = transfer.amount,
                    "Reversed transfer after failed pool operation"
                ),
                Err(e) => error!(
                    token = %transfer.token.address(),
                    counterparty = %transfer.counterparty,
                    amount = transfer.amount,
                    "Failed to reverse transfer: {}",
                    e
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> InMemoryToken {
        InMemoryToken::new(TokenAddress::repeat_byte(1), "USDA", 18)
    }

    #[test]
    fn test_mint_and_transfer() {
        let token = token();
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);

        token.mint(alice, 100).unwrap();
        token.transfer(alice, bob, 40).unwrap();

        assert_eq!(token.balance_of(&alice), 60);
        assert_eq!(token.balance_of(&bob), 40);
        assert_eq!(token.total_supply(), 100);
        assert_eq!(token.symbol(), "USDA");

        let err = token.transfer(bob, alice, 41).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { balance: 40, needed: 41, .. }));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let token = token();
        let owner = Address::repeat_byte(0x01);
        let spender = Address::repeat_byte(0x02);
        token.mint(owner, 100).unwrap();

        let err = token.transfer_from(spender, owner, spender, 10).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { allowance: 0, .. }));

        token.approve(owner, spender, 30).unwrap();
        token.transfer_from(spender, owner, spender, 10).unwrap();
        assert_eq!(token.allowance(&owner, &spender), 20);
        assert_eq!(token.balance_of(&spender), 10);

        // Unlimited approvals are not decremented
        token.approve(owner, spender, u128::MAX).unwrap();
        token.transfer_from(spender, owner, spender, 10).unwrap();
        assert_eq!(token.allowance(&owner, &spender), u128::MAX);
    }

    #[test]
    fn test_batch_rollback_restores_balances() {
        let a = token();
        let b = InMemoryToken::new(TokenAddress::repeat_byte(2), "USDB", 18);
        let pool = Address::repeat_byte(0xaa);
        let user = Address::repeat_byte(0x10);

        a.mint(user, 50).unwrap();
        a.approve(user, pool, 50).unwrap();
        b.mint(user, 5).unwrap();
        b.approve(user, pool, 50).unwrap();

        let mut batch = TransferBatch::new(pool);
        batch.pull(&a, user, 50).unwrap();
        assert!(batch.pull(&b, user, 20).is_err());
        batch.rollback();

        assert_eq!(a.balance_of(&user), 50);
        assert_eq!(a.balance_of(&pool), 0);
        assert_eq!(a.allowance(&user, &pool), 50);
        assert_eq!(b.balance_of(&user), 5);
    }
}
