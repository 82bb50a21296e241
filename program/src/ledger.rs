use solana_program::{entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey};

use crate::state::EscrowRecord;

/// Record store for escrows, keyed by derived address.
///
/// The state machine is the only writer. Implementations must not mutate a
/// record outside of `store` and `retire`.
pub trait EscrowLedger {
    /// Reads the record at `address`, `None` if nothing is stored there.
    fn load(&self, address: &Pubkey) -> Result<Option<EscrowRecord>, ProgramError>;

    /// Reserves backing storage before funds move in.
    ///
    /// Called once per `Initialize`, before the transfer and before `store`.
    fn allocate(&mut self, _address: &Pubkey, _record: &EscrowRecord) -> ProgramResult {
        Ok(())
    }

    fn store(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult;

    /// Finalizes a terminal record and releases its storage, returning any
    /// collateral to `record.sender`.
    fn retire(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult;
}
