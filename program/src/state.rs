use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};

use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};

use crate::commitment::{SecretDigest, DIGEST_LEN};

/// Which balance an escrow locks.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Lamports held directly by the escrow account
    Native,
    /// SPL token balance of the given mint
    Fungible(Pubkey),
}

impl AssetKind {
    pub fn mint(&self) -> Option<&Pubkey> {
        match self {
            AssetKind::Native => None,
            AssetKind::Fungible(mint) => Some(mint),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowStatus {
    Active,
    Redeemed,
    Reclaimed,
}

impl EscrowStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EscrowStatus::Active)
    }
}

/// One hash-time-locked escrow, stored at its derived address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscrowRecord {
    pub is_initialized: bool,
    pub status: EscrowStatus,
    pub asset: AssetKind,
    pub sender: Pubkey,
    pub amount: u64,
    pub digest: SecretDigest,
    pub expiration: UnixTimestamp,
    pub created_at: UnixTimestamp,
    /// Account custodying the locked funds. The escrow address itself for
    /// native escrows.
    pub holding_account: Pubkey,
    pub bump: u8,
}

impl EscrowRecord {
    pub fn is_active(&self) -> bool {
        self.is_initialized && self.status == EscrowStatus::Active
    }
}

impl Sealed for EscrowRecord {}

impl IsInitialized for EscrowRecord {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

const STATUS_ACTIVE: u8 = 0;
const STATUS_REDEEMED: u8 = 1;
const STATUS_RECLAIMED: u8 = 2;

const ASSET_NATIVE: u8 = 0;
const ASSET_FUNGIBLE: u8 = 1;

impl Pack for EscrowRecord {
    const LEN: usize = 156;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, EscrowRecord::LEN];
        let (
            is_initialized,
            status,
            asset_tag,
            mint,
            sender,
            amount,
            digest,
            expiration,
            created_at,
            holding_account,
            bump,
        ) = array_refs![src, 1, 1, 1, PUBKEY_BYTES, PUBKEY_BYTES, 8, DIGEST_LEN, 8, 8, PUBKEY_BYTES, 1];

        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        let status = match status {
            [STATUS_ACTIVE] => EscrowStatus::Active,
            [STATUS_REDEEMED] => EscrowStatus::Redeemed,
            [STATUS_RECLAIMED] => EscrowStatus::Reclaimed,
            _ => return Err(ProgramError::InvalidAccountData),
        };
        let asset = match asset_tag {
            [ASSET_NATIVE] => AssetKind::Native,
            [ASSET_FUNGIBLE] => AssetKind::Fungible(Pubkey::new_from_array(*mint)),
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(EscrowRecord {
            is_initialized,
            status,
            asset,
            sender: Pubkey::new_from_array(*sender),
            amount: u64::from_le_bytes(*amount),
            digest: SecretDigest::new(*digest),
            expiration: i64::from_le_bytes(*expiration),
            created_at: i64::from_le_bytes(*created_at),
            holding_account: Pubkey::new_from_array(*holding_account),
            bump: bump[0],
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, EscrowRecord::LEN];
        let (
            is_initialized_dst,
            status_dst,
            asset_tag_dst,
            mint_dst,
            sender_dst,
            amount_dst,
            digest_dst,
            expiration_dst,
            created_at_dst,
            holding_account_dst,
            bump_dst,
        ) = mut_array_refs![dst, 1, 1, 1, PUBKEY_BYTES, PUBKEY_BYTES, 8, DIGEST_LEN, 8, 8, PUBKEY_BYTES, 1];

        is_initialized_dst[0] = self.is_initialized as u8;
        status_dst[0] = match self.status {
            EscrowStatus::Active => STATUS_ACTIVE,
            EscrowStatus::Redeemed => STATUS_REDEEMED,
            EscrowStatus::Reclaimed => STATUS_RECLAIMED,
        };
        match self.asset {
            AssetKind::Native => {
                asset_tag_dst[0] = ASSET_NATIVE;
                *mint_dst = [0u8; PUBKEY_BYTES];
            }
            AssetKind::Fungible(mint) => {
                asset_tag_dst[0] = ASSET_FUNGIBLE;
                mint_dst.copy_from_slice(mint.as_ref());
            }
        }
        sender_dst.copy_from_slice(self.sender.as_ref());
        *amount_dst = self.amount.to_le_bytes();
        *digest_dst = self.digest.to_bytes();
        *expiration_dst = self.expiration.to_le_bytes();
        *created_at_dst = self.created_at.to_le_bytes();
        holding_account_dst.copy_from_slice(self.holding_account.as_ref());
        bump_dst[0] = self.bump;
    }
}
