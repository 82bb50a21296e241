use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
    sysvar::{self, Sysvar},
};

use crate::{
    adapter::{AccountLedger, AccountTransfer},
    error::EscrowError,
    instruction::EscrowInstruction,
    machine::{EscrowMachine, InitializeRequest},
    state::AssetKind,
};

pub struct Processor;
impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::unpack(instruction_data)?;

        match instruction {
            EscrowInstruction::Initialize {
                amount,
                expiration,
                digest,
                asset,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(accounts, amount, expiration, &digest, asset, program_id)
            }
            EscrowInstruction::Redeem { secret } => {
                msg!("Instruction: Redeem");
                Self::process_redeem(accounts, &secret, program_id)
            }
            EscrowInstruction::Reclaim => {
                msg!("Instruction: Reclaim");
                Self::process_reclaim(accounts, program_id)
            }
        }
    }

    fn process_initialize(
        accounts: &[AccountInfo],
        amount: u64,
        expiration: i64,
        digest: &[u8],
        asset: AssetKind,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let sender = next_account_info(account_info_iter)?;

        if !sender.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        // resolved by address inside the ledger
        let _escrow = next_account_info(account_info_iter)?;

        let system = next_account_info(account_info_iter)?;
        if *system.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let clock = Clock::from_account_info(next_account_info(account_info_iter)?)?;

        let rent_info = next_account_info(account_info_iter)?;
        if !sysvar::rent::check_id(rent_info.key) {
            return Err(ProgramError::InvalidArgument);
        }

        let source = match asset {
            AssetKind::Native => *sender.key,
            AssetKind::Fungible(mint) => {
                let sender_token_account = next_account_info(account_info_iter)?;
                let _holding = next_account_info(account_info_iter)?;

                let mint_info = next_account_info(account_info_iter)?;
                if *mint_info.key != mint {
                    return Err(EscrowError::MintMismatch.into());
                }

                let token_program = next_account_info(account_info_iter)?;
                if *token_program.key != spl_token::id() {
                    return Err(ProgramError::IncorrectProgramId);
                }

                *sender_token_account.key
            }
        };

        let request = InitializeRequest {
            sender: *sender.key,
            source,
            amount,
            expiration,
            digest,
            asset,
        };

        let mut ledger = AccountLedger::new(program_id, accounts);
        let mut bank = AccountTransfer::new(program_id, accounts);
        EscrowMachine::new(program_id, &mut ledger, &mut bank)
            .initialize(request, clock.unix_timestamp)?;

        Ok(())
    }

    fn process_redeem(accounts: &[AccountInfo], secret: &[u8], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        // The secret authorizes the payout; the caller only pays fees and
        // the rent of a recipient token account opened for it.
        let caller = next_account_info(account_info_iter)?;
        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = next_account_info(account_info_iter)?;
        let recipient = next_account_info(account_info_iter)?;
        let _sender = next_account_info(account_info_iter)?;
        let clock = Clock::from_account_info(next_account_info(account_info_iter)?)?;

        let mut ledger = AccountLedger::new(program_id, accounts);
        let mut bank = AccountTransfer::new(program_id, accounts).with_payer(caller.key);
        EscrowMachine::new(program_id, &mut ledger, &mut bank).redeem(
            escrow.key,
            secret,
            recipient.key,
            clock.unix_timestamp,
        )?;

        Ok(())
    }

    fn process_reclaim(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller = next_account_info(account_info_iter)?;
        if !caller.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = next_account_info(account_info_iter)?;
        let refund_to = next_account_info(account_info_iter)?;
        let _sender = next_account_info(account_info_iter)?;
        let clock = Clock::from_account_info(next_account_info(account_info_iter)?)?;

        msg!("Reclaim requested by {}", caller.key);
        let mut ledger = AccountLedger::new(program_id, accounts);
        let mut bank = AccountTransfer::new(program_id, accounts).with_payer(caller.key);
        EscrowMachine::new(program_id, &mut ledger, &mut bank).reclaim(
            escrow.key,
            refund_to.key,
            clock.unix_timestamp,
        )?;

        Ok(())
    }
}
