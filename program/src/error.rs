use thiserror::Error;

use solana_program::program_error::ProgramError;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// Instruction data could not be decoded
    #[error("Invalid Instruction")]
    InvalidInstruction,

    // Input validation
    #[error("Invalid Digest Length")]
    InvalidDigestLength,
    #[error("Zero Amount")]
    ZeroAmount,
    #[error("Expiration In Past")]
    ExpirationInPast,

    // State conflicts
    #[error("Escrow Already Exists")]
    EscrowAlreadyExists,
    #[error("Escrow Not Active")]
    EscrowNotActive,
    #[error("Escrow Not Found")]
    EscrowNotFound,

    /// Presented secret does not hash to the committed digest
    #[error("Secret Mismatch")]
    SecretMismatch,

    // Temporal
    #[error("Escrow Expired")]
    EscrowExpired,
    #[error("Escrow Not Expired")]
    EscrowNotExpired,

    // Asset transfer
    #[error("Insufficient Funds")]
    InsufficientFunds,
    #[error("Account Not Found")]
    AccountNotFound,

    /// No bump in 0..=255 produced an off-curve address
    #[error("Derivation Exhausted")]
    DerivationExhausted,
    #[error("Invalid Escrow Address")]
    InvalidEscrowAddress,
    #[error("Source Owner Mismatch")]
    SourceOwnerMismatch,
    #[error("Refund Destination Mismatch")]
    RefundDestinationMismatch,
    #[error("Mint Mismatch")]
    MintMismatch,
    #[error("Amount Overflow")]
    AmountOverflow,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
