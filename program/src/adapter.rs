//! Ledger and transfer implementations over the accounts of one instruction.
//!
//! Both look accounts up by key in the instruction's account list, so the
//! state machine can name accounts by address the same way it does
//! off-chain.

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{self, rent::Rent, Sysvar},
};

use spl_associated_token_account::{create_associated_token_account, get_associated_token_address};
use spl_token::state::Account as TokenAccount;

use crate::{
    error::EscrowError,
    ledger::EscrowLedger,
    pda::{self, EscrowSeeds, HOLDING_SEED},
    state::{AssetKind, EscrowRecord},
    transfer::AssetTransfer,
};

fn find_account<'a, 'info>(
    accounts: &'a [AccountInfo<'info>],
    key: &Pubkey,
) -> Result<&'a AccountInfo<'info>, ProgramError> {
    accounts
        .iter()
        .find(|account| account.key == key)
        .ok_or_else(|| EscrowError::AccountNotFound.into())
}

fn unpack_token_account(
    account: &AccountInfo,
    mint: &Pubkey,
) -> Result<TokenAccount, ProgramError> {
    if *account.owner != spl_token::id() {
        return Err(EscrowError::AccountNotFound.into());
    }
    let token = TokenAccount::unpack(&account.data.borrow())?;
    if token.mint != *mint {
        return Err(EscrowError::MintMismatch.into());
    }
    Ok(token)
}

fn with_escrow_signer<R>(record: &EscrowRecord, f: impl FnOnce(&[&[u8]]) -> R) -> R {
    let seeds = EscrowSeeds::new(&record.asset, &record.sender, &record.digest);
    let bump = [record.bump];
    let mut signer = seeds.parts();
    signer.push(&bump);
    f(signer.as_slice())
}

/// Creates a rent-exempt account at the program address signed for by
/// `signer`.
///
/// Anyone can send lamports to a derived address before it is created, and
/// `create_account` refuses a target that already holds lamports. Such an
/// account is topped up to rent exemption, then allocated and assigned.
fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    rent: &Rent,
    space: usize,
    owner: &Pubkey,
    signer: &[&[u8]],
) -> ProgramResult {
    let required = rent.minimum_balance(space);
    if target.lamports() == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                target.key,
                required,
                space as u64,
                owner,
            ),
            &[payer.clone(), target.clone(), system_program.clone()],
            &[signer],
        );
    }

    let top_up = required.saturating_sub(target.lamports());
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, target.key, top_up),
            &[payer.clone(), target.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(target.key, space as u64),
        &[target.clone(), system_program.clone()],
        &[signer],
    )?;
    invoke_signed(
        &system_instruction::assign(target.key, owner),
        &[target.clone(), system_program.clone()],
        &[signer],
    )
}

/// Escrow records stored in program-owned accounts.
pub struct AccountLedger<'a, 'info> {
    program_id: &'a Pubkey,
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> AccountLedger<'a, 'info> {
    pub fn new(program_id: &'a Pubkey, accounts: &'a [AccountInfo<'info>]) -> Self {
        Self {
            program_id,
            accounts,
        }
    }
}

impl<'a, 'info> EscrowLedger for AccountLedger<'a, 'info> {
    fn load(&self, address: &Pubkey) -> Result<Option<EscrowRecord>, ProgramError> {
        let escrow = find_account(self.accounts, address)?;
        if escrow.owner != self.program_id || escrow.data_len() != EscrowRecord::LEN {
            return Ok(None);
        }
        let record = EscrowRecord::unpack_unchecked(&escrow.data.borrow())?;
        Ok(Some(record).filter(|record| record.is_initialized))
    }

    fn allocate(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult {
        let escrow = find_account(self.accounts, address)?;
        let payer = find_account(self.accounts, &record.sender)?;
        let system_program = find_account(self.accounts, &system_program::id())?;
        let rent_info = find_account(self.accounts, &sysvar::rent::id())?;
        let rent = Rent::from_account_info(rent_info)?;

        msg!("Calling the system program to create the escrow account...");
        with_escrow_signer(record, |signer| {
            create_pda_account(
                payer,
                escrow,
                system_program,
                &rent,
                EscrowRecord::LEN,
                self.program_id,
                signer,
            )
        })?;

        if let AssetKind::Fungible(mint) = record.asset {
            let holding = find_account(self.accounts, &record.holding_account)?;
            let mint_info = find_account(self.accounts, &mint)?;
            let token_program = find_account(self.accounts, &spl_token::id())?;

            let (holding_address, holding_bump) = pda::derive_holding(address, self.program_id)?;
            if holding_address != record.holding_account {
                return Err(EscrowError::InvalidEscrowAddress.into());
            }
            let holding_bump = [holding_bump];
            let holding_signer: &[&[u8]] = &[HOLDING_SEED, address.as_ref(), &holding_bump];

            msg!("Calling the system program to create the holding account...");
            create_pda_account(
                payer,
                holding,
                system_program,
                &rent,
                TokenAccount::LEN,
                &spl_token::id(),
                holding_signer,
            )?;

            msg!("Calling the token program to initialize the holding account...");
            invoke(
                &spl_token::instruction::initialize_account(
                    token_program.key,
                    holding.key,
                    &mint,
                    escrow.key,
                )?,
                &[
                    holding.clone(),
                    mint_info.clone(),
                    escrow.clone(),
                    rent_info.clone(),
                    token_program.clone(),
                ],
            )?;
        }

        Ok(())
    }

    fn store(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult {
        let escrow = find_account(self.accounts, address)?;
        EscrowRecord::pack(*record, &mut escrow.data.borrow_mut())
    }

    fn retire(&mut self, address: &Pubkey, record: &EscrowRecord) -> ProgramResult {
        let escrow = find_account(self.accounts, address)?;
        let sender = find_account(self.accounts, &record.sender)?;

        if let AssetKind::Fungible(_) = record.asset {
            let holding = find_account(self.accounts, &record.holding_account)?;
            let token_program = find_account(self.accounts, &spl_token::id())?;
            let close_holding_ix = spl_token::instruction::close_account(
                token_program.key,
                holding.key,
                sender.key,
                escrow.key,
                &[],
            )?;
            msg!("Calling the token program to close the holding account...");
            with_escrow_signer(record, |signer| {
                invoke_signed(
                    &close_holding_ix,
                    &[
                        holding.clone(),
                        sender.clone(),
                        escrow.clone(),
                        token_program.clone(),
                    ],
                    &[signer],
                )
            })?;
        }

        msg!("Closing the escrow account...");
        **sender.lamports.borrow_mut() = sender
            .lamports()
            .checked_add(escrow.lamports())
            .ok_or(EscrowError::AmountOverflow)?;
        **escrow.lamports.borrow_mut() = 0;
        escrow.data.borrow_mut().fill(0);

        Ok(())
    }
}

/// Lamport and SPL token movements between the instruction's accounts.
pub struct AccountTransfer<'a, 'info> {
    program_id: &'a Pubkey,
    accounts: &'a [AccountInfo<'info>],
    // funds token accounts opened for a payout
    payer: Option<&'a Pubkey>,
}

impl<'a, 'info> AccountTransfer<'a, 'info> {
    pub fn new(program_id: &'a Pubkey, accounts: &'a [AccountInfo<'info>]) -> Self {
        Self {
            program_id,
            accounts,
            payer: None,
        }
    }

    pub fn with_payer(mut self, payer: &'a Pubkey) -> Self {
        self.payer = Some(payer);
        self
    }
}

impl<'a, 'info> AssetTransfer for AccountTransfer<'a, 'info> {
    fn owner_of(&self, asset: &AssetKind, account: &Pubkey) -> Result<Pubkey, ProgramError> {
        let account = find_account(self.accounts, account)?;
        match asset {
            AssetKind::Native => Ok(*account.key),
            AssetKind::Fungible(mint) => Ok(unpack_token_account(account, mint)?.owner),
        }
    }

    // A token account is paid directly. Any other key is treated as a
    // wallet and paid through its associated token account, created here
    // if it does not exist yet.
    fn open_destination(
        &mut self,
        asset: &AssetKind,
        holder: &Pubkey,
    ) -> Result<Pubkey, ProgramError> {
        let mint = match asset {
            AssetKind::Native => return Ok(*holder),
            AssetKind::Fungible(mint) => mint,
        };

        let named = find_account(self.accounts, holder)?;
        if *named.owner == spl_token::id() {
            unpack_token_account(named, mint)?;
            return Ok(*holder);
        }

        let address = get_associated_token_address(holder, mint);
        let token_account = find_account(self.accounts, &address)?;
        if *token_account.owner == spl_token::id() {
            unpack_token_account(token_account, mint)?;
            return Ok(address);
        }

        let payer = self.payer.ok_or(EscrowError::AccountNotFound)?;
        let payer = find_account(self.accounts, payer)?;
        let mint_info = find_account(self.accounts, mint)?;
        let system_program = find_account(self.accounts, &system_program::id())?;
        let token_program = find_account(self.accounts, &spl_token::id())?;
        let rent_info = find_account(self.accounts, &sysvar::rent::id())?;
        let associated_program = find_account(self.accounts, &spl_associated_token_account::id())?;

        msg!("Calling the associated token program to create the recipient account...");
        invoke(
            &create_associated_token_account(payer.key, holder, mint),
            &[
                payer.clone(),
                token_account.clone(),
                named.clone(),
                mint_info.clone(),
                system_program.clone(),
                token_program.clone(),
                rent_info.clone(),
                associated_program.clone(),
            ],
        )?;
        Ok(address)
    }

    fn transfer(
        &mut self,
        asset: &AssetKind,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        let source = find_account(self.accounts, from)?;
        let destination = find_account(self.accounts, to)?;

        match asset {
            AssetKind::Native => {
                if source.lamports() < amount {
                    return Err(EscrowError::InsufficientFunds.into());
                }
                if source.owner == self.program_id {
                    // The system program cannot debit accounts that carry data.
                    **source.lamports.borrow_mut() = source
                        .lamports()
                        .checked_sub(amount)
                        .ok_or(EscrowError::InsufficientFunds)?;
                    **destination.lamports.borrow_mut() = destination
                        .lamports()
                        .checked_add(amount)
                        .ok_or(EscrowError::AmountOverflow)?;
                    Ok(())
                } else {
                    let system_program = find_account(self.accounts, &system_program::id())?;
                    msg!("Calling the system program to transfer lamports...");
                    invoke(
                        &system_instruction::transfer(source.key, destination.key, amount),
                        &[source.clone(), destination.clone(), system_program.clone()],
                    )
                }
            }
            AssetKind::Fungible(mint) => {
                let source_state = unpack_token_account(source, mint)?;
                unpack_token_account(destination, mint)?;
                if source_state.amount < amount {
                    return Err(EscrowError::InsufficientFunds.into());
                }

                let authority = find_account(self.accounts, &source_state.owner)?;
                let token_program = find_account(self.accounts, &spl_token::id())?;
                let transfer_ix = spl_token::instruction::transfer(
                    token_program.key,
                    source.key,
                    destination.key,
                    authority.key,
                    &[],
                    amount,
                )?;
                let infos = [
                    source.clone(),
                    destination.clone(),
                    authority.clone(),
                    token_program.clone(),
                ];

                msg!("Calling the token program to transfer tokens...");
                if authority.owner == self.program_id {
                    let record = EscrowRecord::unpack(&authority.data.borrow())?;
                    with_escrow_signer(&record, |signer| {
                        invoke_signed(&transfer_ix, &infos, &[signer])
                    })
                } else {
                    invoke(&transfer_ix, &infos)
                }
            }
        }
    }
}
