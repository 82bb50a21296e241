//! Escrow transition rules.
//!
//! `Active` is entered by `initialize` and left exactly once, either to
//! `Redeemed` by presenting the secret before expiration or to `Reclaimed`
//! once expiration has passed. Every check runs before any funds move, so a
//! rejected transition leaves the ledger untouched.

use std::convert::TryFrom;

use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    commitment::SecretDigest,
    error::EscrowError,
    ledger::EscrowLedger,
    pda::{self, EscrowSeeds},
    state::{AssetKind, EscrowRecord, EscrowStatus},
    transfer::AssetTransfer,
};

#[derive(Clone, Copy, Debug)]
pub struct InitializeRequest<'a> {
    pub sender: Pubkey,
    /// Account the funds are taken from. The sender itself for native
    /// escrows, a token account owned by the sender for fungible ones.
    pub source: Pubkey,
    pub amount: u64,
    pub expiration: UnixTimestamp,
    pub digest: &'a [u8],
    pub asset: AssetKind,
}

/// What authorizes releasing an active escrow.
#[derive(Clone, Copy, Debug)]
pub enum Claim<'a> {
    /// Knowing the preimage of the digest. Whoever holds it names the
    /// recipient; caller identity plays no part.
    Preimage { secret: &'a [u8], recipient: Pubkey },
    /// The expiration having passed. Funds can only go back to the sender.
    Expiry { refund_to: Pubkey },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub status: EscrowStatus,
    pub destination: Pubkey,
    pub amount: u64,
}

pub struct EscrowMachine<'a, L, T> {
    program_id: &'a Pubkey,
    ledger: &'a mut L,
    bank: &'a mut T,
}

impl<'a, L: EscrowLedger, T: AssetTransfer> EscrowMachine<'a, L, T> {
    pub fn new(program_id: &'a Pubkey, ledger: &'a mut L, bank: &'a mut T) -> Self {
        Self {
            program_id,
            ledger,
            bank,
        }
    }

    /// Returns the escrow address and the stored record.
    pub fn initialize(
        &mut self,
        request: InitializeRequest,
        now: UnixTimestamp,
    ) -> Result<(Pubkey, EscrowRecord), ProgramError> {
        let digest = SecretDigest::try_from(request.digest)?;
        if request.amount == 0 {
            return Err(EscrowError::ZeroAmount.into());
        }
        if request.expiration <= now {
            return Err(EscrowError::ExpirationInPast.into());
        }

        let seeds = EscrowSeeds::new(&request.asset, &request.sender, &digest);
        let (address, bump) = seeds.derive(self.program_id)?;

        if let Some(existing) = self.ledger.load(&address)? {
            if existing.is_active() {
                return Err(EscrowError::EscrowAlreadyExists.into());
            }
        }

        if self.bank.owner_of(&request.asset, &request.source)? != request.sender {
            return Err(EscrowError::SourceOwnerMismatch.into());
        }

        let holding_account = match request.asset {
            AssetKind::Native => address,
            AssetKind::Fungible(_) => pda::derive_holding(&address, self.program_id)?.0,
        };

        let record = EscrowRecord {
            is_initialized: true,
            status: EscrowStatus::Active,
            asset: request.asset,
            sender: request.sender,
            amount: request.amount,
            digest,
            expiration: request.expiration,
            created_at: now,
            holding_account,
            bump,
        };

        self.ledger.allocate(&address, &record)?;
        self.bank.transfer(
            &record.asset,
            &request.source,
            &record.holding_account,
            record.amount,
        )?;
        self.ledger.store(&address, &record)?;

        msg!(
            "Escrow {} locked {} until {}",
            address,
            record.amount,
            record.expiration
        );
        Ok((address, record))
    }

    pub fn redeem(
        &mut self,
        escrow: &Pubkey,
        secret: &[u8],
        recipient: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Settlement, ProgramError> {
        self.settle(
            escrow,
            Claim::Preimage {
                secret,
                recipient: *recipient,
            },
            now,
        )
    }

    pub fn reclaim(
        &mut self,
        escrow: &Pubkey,
        refund_to: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Settlement, ProgramError> {
        self.settle(
            escrow,
            Claim::Expiry {
                refund_to: *refund_to,
            },
            now,
        )
    }

    pub fn settle(
        &mut self,
        escrow: &Pubkey,
        claim: Claim,
        now: UnixTimestamp,
    ) -> Result<Settlement, ProgramError> {
        let mut record = match self.ledger.load(escrow)? {
            Some(record) if record.is_active() => record,
            _ => return Err(EscrowError::EscrowNotActive.into()),
        };

        let seeds = EscrowSeeds::new(&record.asset, &record.sender, &record.digest);
        if pda::derive_with_bump(&seeds.parts(), record.bump, self.program_id)? != *escrow {
            return Err(EscrowError::InvalidEscrowAddress.into());
        }

        let (status, destination) = match claim {
            Claim::Preimage { secret, recipient } => {
                if now >= record.expiration {
                    return Err(EscrowError::EscrowExpired.into());
                }
                if !record.digest.verify(secret) {
                    return Err(EscrowError::SecretMismatch.into());
                }
                let destination = self.bank.open_destination(&record.asset, &recipient)?;
                (EscrowStatus::Redeemed, destination)
            }
            Claim::Expiry { refund_to } => {
                if now < record.expiration {
                    return Err(EscrowError::EscrowNotExpired.into());
                }
                let destination = self.bank.open_destination(&record.asset, &refund_to)?;
                if self.bank.owner_of(&record.asset, &destination)? != record.sender {
                    return Err(EscrowError::RefundDestinationMismatch.into());
                }
                (EscrowStatus::Reclaimed, destination)
            }
        };

        self.bank.transfer(
            &record.asset,
            &record.holding_account,
            &destination,
            record.amount,
        )?;
        record.status = status;
        self.ledger.retire(escrow, &record)?;

        msg!("Escrow {} {:?} to {}", escrow, status, destination);
        Ok(Settlement {
            status,
            destination,
            amount: record.amount,
        })
    }

    // any status, terminal records included
    pub fn lookup(&self, seeds: &EscrowSeeds) -> Result<EscrowRecord, ProgramError> {
        let (address, _) = seeds.derive(self.program_id)?;
        self.ledger
            .load(&address)?
            .filter(|record| record.is_initialized)
            .ok_or_else(|| EscrowError::EscrowNotFound.into())
    }
}
