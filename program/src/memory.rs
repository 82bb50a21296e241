//! In-memory ledger and bank for running escrows off-chain.
//!
//! Balances are keyed by `(asset, holder)`; a token "account" is just the
//! holder's balance of that mint. Crediting an unknown holder opens it,
//! debiting one fails with `AccountNotFound`, mirroring how the runtime treats
//! lamport transfers to fresh addresses.

use std::collections::HashMap;

use solana_program::{entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::EscrowError, ledger::EscrowLedger, state::AssetKind, state::EscrowRecord,
    transfer::AssetTransfer,
};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: HashMap<Pubkey, EscrowRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EscrowLedger for MemoryLedger {
    fn load(&self, address: &Pubkey) -> Result<Option<EscrowRecord>, ProgramError> {
        Ok(self.records.get(address).copied())
    }

    fn store(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult {
        self.records.insert(*address, *record);
        Ok(())
    }

    // Terminal records stay readable so callers can see how an escrow ended.
    fn retire(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult {
        self.records.insert(*address, *record);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBank {
    balances: HashMap<(AssetKind, Pubkey), u64>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `holder`, opening the account if needed.
    pub fn deposit(&mut self, asset: AssetKind, holder: Pubkey, amount: u64) -> ProgramResult {
        let balance = self.balances.entry((asset, holder)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        Ok(())
    }

    pub fn balance(&self, asset: &AssetKind, holder: &Pubkey) -> u64 {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }
}

impl AssetTransfer for MemoryBank {
    fn owner_of(&self, asset: &AssetKind, account: &Pubkey) -> Result<Pubkey, ProgramError> {
        if self.balances.contains_key(&(*asset, *account)) {
            Ok(*account)
        } else {
            Err(EscrowError::AccountNotFound.into())
        }
    }

    fn transfer(
        &mut self,
        asset: &AssetKind,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        let available = *self
            .balances
            .get(&(*asset, *from))
            .ok_or(EscrowError::AccountNotFound)?;
        let remaining = available
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFunds)?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(asset, to)
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;

        self.balances.insert((*asset, *from), remaining);
        self.balances.insert((*asset, *to), credited);
        Ok(())
    }
}
