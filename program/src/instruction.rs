use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};

use spl_associated_token_account::get_associated_token_address;

use crate::{
    commitment::SecretDigest,
    error::EscrowError,
    pda::{self, EscrowSeeds},
    state::{AssetKind, EscrowRecord},
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum EscrowInstruction {
    /// Locks `amount` behind `digest` until `expiration`.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The sender, pays for the escrow account
    /// 1. `[writable]` The escrow account, derived from the seeds
    /// 2. `[]` The system program
    /// 3. `[]` The clock sysvar
    /// 4. `[]` The rent sysvar
    ///
    /// Fungible escrows additionally:
    ///
    /// 5. `[writable]` The sender's token account funding the escrow
    /// 6. `[writable]` The holding token account, derived from the escrow
    /// 7. `[]` The mint
    /// 8. `[]` The token program
    Initialize {
        amount: u64,
        expiration: i64,
        digest: Vec<u8>,
        asset: AssetKind,
    },
    /// Pays the escrow out to the recipient in exchange for the secret.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The caller, possibly a relayer
    /// 1. `[writable]` The escrow account
    /// 2. `[writable]` The recipient, a wallet or a token account of the mint
    /// 3. `[writable]` The sender, receives the escrow's rent
    /// 4. `[]` The clock sysvar
    ///
    /// Fungible escrows additionally:
    ///
    /// 5. `[writable]` The holding token account
    /// 6. `[]` The token program
    /// 7. `[writable]` The recipient's associated token account, opened at
    ///    the caller's expense if missing
    /// 8. `[]` The mint
    /// 9. `[]` The system program
    /// 10. `[]` The rent sysvar
    /// 11. `[]` The associated token account program
    Redeem { secret: Vec<u8> },
    /// Returns an expired escrow to its sender.
    ///
    /// Accounts are the same as `Redeem`, with the sender's refund
    /// destination in place of the recipient.
    Reclaim,
}

impl EscrowInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| EscrowError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| EscrowError::InvalidInstruction.into())
    }
}

/// Creates an `Initialize` instruction locking lamports.
pub fn initialize_native(
    program_id: &Pubkey,
    sender: &Pubkey,
    amount: u64,
    expiration: i64,
    digest: &SecretDigest,
) -> Result<Instruction, ProgramError> {
    let asset = AssetKind::Native;
    let (escrow, _) = EscrowSeeds::new(&asset, sender, digest).derive(program_id)?;
    let data = EscrowInstruction::Initialize {
        amount,
        expiration,
        digest: digest.as_ref().to_vec(),
        asset,
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: initialize_accounts(sender, &escrow),
        data,
    })
}

/// Creates an `Initialize` instruction locking tokens of `mint` taken from
/// `sender_token_account`.
pub fn initialize_fungible(
    program_id: &Pubkey,
    sender: &Pubkey,
    sender_token_account: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    expiration: i64,
    digest: &SecretDigest,
) -> Result<Instruction, ProgramError> {
    let asset = AssetKind::Fungible(*mint);
    let (escrow, _) = EscrowSeeds::new(&asset, sender, digest).derive(program_id)?;
    let (holding, _) = pda::derive_holding(&escrow, program_id)?;
    let data = EscrowInstruction::Initialize {
        amount,
        expiration,
        digest: digest.as_ref().to_vec(),
        asset,
    }
    .pack()?;

    let mut accounts = initialize_accounts(sender, &escrow);
    accounts.push(AccountMeta::new(*sender_token_account, false));
    accounts.push(AccountMeta::new(holding, false));
    accounts.push(AccountMeta::new_readonly(*mint, false));
    accounts.push(AccountMeta::new_readonly(spl_token::id(), false));

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Creates a `Redeem` instruction for the escrow at `escrow`.
pub fn redeem(
    program_id: &Pubkey,
    caller: &Pubkey,
    escrow: &Pubkey,
    record: &EscrowRecord,
    recipient: &Pubkey,
    secret: &[u8],
) -> Result<Instruction, ProgramError> {
    let data = EscrowInstruction::Redeem {
        secret: secret.to_vec(),
    }
    .pack()?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: settle_accounts(caller, escrow, record, recipient),
        data,
    })
}

/// Creates a `Reclaim` instruction refunding `record.sender` through `refund_to`.
pub fn reclaim(
    program_id: &Pubkey,
    caller: &Pubkey,
    escrow: &Pubkey,
    record: &EscrowRecord,
    refund_to: &Pubkey,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: settle_accounts(caller, escrow, record, refund_to),
        data: EscrowInstruction::Reclaim.pack()?,
    })
}

fn initialize_accounts(sender: &Pubkey, escrow: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*sender, true),
        AccountMeta::new(*escrow, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ]
}

fn settle_accounts(
    caller: &Pubkey,
    escrow: &Pubkey,
    record: &EscrowRecord,
    destination: &Pubkey,
) -> Vec<AccountMeta> {
    let mut accounts = vec![
        AccountMeta::new(*caller, true),
        AccountMeta::new(*escrow, false),
        AccountMeta::new(*destination, false),
        AccountMeta::new(record.sender, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];
    if let AssetKind::Fungible(mint) = record.asset {
        accounts.push(AccountMeta::new(record.holding_account, false));
        accounts.push(AccountMeta::new_readonly(spl_token::id(), false));
        accounts.push(AccountMeta::new(
            get_associated_token_address(destination, &mint),
            false,
        ));
        accounts.push(AccountMeta::new_readonly(mint, false));
        accounts.push(AccountMeta::new_readonly(system_program::id(), false));
        accounts.push(AccountMeta::new_readonly(sysvar::rent::id(), false));
        accounts.push(AccountMeta::new_readonly(
            spl_associated_token_account::id(),
            false,
        ));
    }
    accounts
}
