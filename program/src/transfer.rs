use solana_program::{entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey};

use crate::state::AssetKind;

/// Moves balances of the underlying asset ledger.
///
/// Balance arithmetic lives behind this trait; the escrow only decides when
/// and between which accounts funds move.
pub trait AssetTransfer {
    /// The identity controlling the balance held at `account`.
    ///
    /// For lamports that is the account itself, for a token account it is
    /// the token account's owner.
    fn owner_of(&self, asset: &AssetKind, account: &Pubkey) -> Result<Pubkey, ProgramError>;

    /// Resolves the account that receives a payout named `holder`, opening
    /// it first if the asset needs one.
    fn open_destination(
        &mut self,
        _asset: &AssetKind,
        holder: &Pubkey,
    ) -> Result<Pubkey, ProgramError> {
        Ok(*holder)
    }

    /// Moves `amount` units of `asset` from `from` to `to`.
    ///
    /// Fails with `InsufficientFunds` or `AccountNotFound` without moving
    /// anything.
    fn transfer(&mut self, asset: &AssetKind, from: &Pubkey, to: &Pubkey, amount: u64)
        -> ProgramResult;
}
