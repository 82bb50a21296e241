//! Program derived addresses for escrows and their holding accounts.
//!
//! Any party that knows the seeds and the program id can recompute where an
//! escrow lives, so sender, redeemer and relayer agree on the location
//! without talking to each other.

use solana_program::{
    program_error::ProgramError,
    pubkey::{Pubkey, PubkeyError},
};

use crate::{commitment::SecretDigest, error::EscrowError, state::AssetKind};

/// Domain tag for escrows locking lamports.
pub const NATIVE_SEED: &[u8] = b"escrow_native";
/// Domain tag for escrows locking SPL tokens.
pub const FUNGIBLE_SEED: &[u8] = b"escrow_fungible";
/// Domain tag for the token account custodying a fungible escrow.
pub const HOLDING_SEED: &[u8] = b"escrow_holding";

/// Scans `bump` from 255 down to 0 and returns the first address off the
/// ed25519 curve for `seeds ++ [bump]` under `namespace`.
pub fn derive(seeds: &[&[u8]], namespace: &Pubkey) -> Result<(Pubkey, u8), ProgramError> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut seeds_with_bump = seeds.to_vec();
        seeds_with_bump.push(&bump_seed);
        match Pubkey::create_program_address(&seeds_with_bump, namespace) {
            Ok(address) => return Ok((address, bump)),
            Err(PubkeyError::InvalidSeeds) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(EscrowError::DerivationExhausted.into())
}

/// Recomputes an address from seeds and a known bump, without the search.
pub fn derive_with_bump(
    seeds: &[&[u8]],
    bump: u8,
    namespace: &Pubkey,
) -> Result<Pubkey, ProgramError> {
    let bump_seed = [bump];
    let mut seeds_with_bump = seeds.to_vec();
    seeds_with_bump.push(&bump_seed);
    Pubkey::create_program_address(&seeds_with_bump, namespace).map_err(Into::into)
}

/// The seed tuple naming one escrow.
///
/// Native escrows are bound to their sender, fungible escrows are looked up
/// by digest alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowSeeds {
    Native {
        sender: Pubkey,
        digest: SecretDigest,
    },
    Fungible {
        digest: SecretDigest,
    },
}

impl EscrowSeeds {
    pub fn new(asset: &AssetKind, sender: &Pubkey, digest: &SecretDigest) -> Self {
        match asset {
            AssetKind::Native => EscrowSeeds::Native {
                sender: *sender,
                digest: *digest,
            },
            AssetKind::Fungible(_) => EscrowSeeds::Fungible { digest: *digest },
        }
    }

    pub fn parts(&self) -> Vec<&[u8]> {
        match self {
            EscrowSeeds::Native { sender, digest } => {
                vec![NATIVE_SEED, sender.as_ref(), digest.as_ref()]
            }
            EscrowSeeds::Fungible { digest } => vec![FUNGIBLE_SEED, digest.as_ref()],
        }
    }

    pub fn derive(&self, program_id: &Pubkey) -> Result<(Pubkey, u8), ProgramError> {
        derive(&self.parts(), program_id)
    }
}

/// Address of the token account holding a fungible escrow's balance.
pub fn derive_holding(escrow: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), ProgramError> {
    derive(&[HOLDING_SEED, escrow.as_ref()], program_id)
}
