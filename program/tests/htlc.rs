use hashlock_escrow::{
    commitment::{commit, SecretDigest},
    error::EscrowError,
    machine::{EscrowMachine, InitializeRequest, Settlement},
    memory::{MemoryBank, MemoryLedger},
    pda::EscrowSeeds,
    state::{AssetKind, EscrowStatus},
};
use proptest::prelude::*;
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

const NOW: UnixTimestamp = 1_700_000_000;
const SECRET: &[u8] = b"fixedsecret1234567890abcdef12345678";
const AMOUNT: u64 = 200_000_000;

struct Harness {
    program_id: Pubkey,
    ledger: MemoryLedger,
    bank: MemoryBank,
    sender: Pubkey,
}

impl Harness {
    fn new(asset: AssetKind, funds: u64) -> Self {
        let sender = Pubkey::new_unique();
        let mut bank = MemoryBank::new();
        bank.deposit(asset, sender, funds).unwrap();
        Self {
            program_id: Pubkey::new_unique(),
            ledger: MemoryLedger::new(),
            bank,
            sender,
        }
    }

    fn machine(&mut self) -> EscrowMachine<'_, MemoryLedger, MemoryBank> {
        EscrowMachine::new(&self.program_id, &mut self.ledger, &mut self.bank)
    }

    fn lock(
        &mut self,
        asset: AssetKind,
        amount: u64,
        digest: &SecretDigest,
    ) -> Result<Pubkey, ProgramError> {
        let request = InitializeRequest {
            sender: self.sender,
            source: self.sender,
            amount,
            expiration: NOW + 3_600,
            digest: digest.as_ref(),
            asset,
        };
        self.machine()
            .initialize(request, NOW)
            .map(|(address, _)| address)
    }

    fn balance(&self, asset: &AssetKind, holder: &Pubkey) -> u64 {
        self.bank.balance(asset, holder)
    }
}

#[test]
fn test_initialize_then_lookup() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let digest = commit(SECRET);
    let escrow = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();

    let sender = h.sender;
    let record = h
        .machine()
        .lookup(&EscrowSeeds::Native { sender, digest })
        .unwrap();

    assert_eq!(record.status, EscrowStatus::Active);
    assert_eq!(record.asset, AssetKind::Native);
    assert_eq!(record.sender, sender);
    assert_eq!(record.amount, AMOUNT);
    assert_eq!(record.digest, digest);
    assert_eq!(record.expiration, NOW + 3_600);
    assert_eq!(record.created_at, NOW);
    assert_eq!(record.holding_account, escrow);
    assert_eq!(h.balance(&AssetKind::Native, &escrow), AMOUNT);
    assert_eq!(h.balance(&AssetKind::Native, &sender), 0);
}

#[test]
fn test_redeem_fixed_secret_native() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let digest = commit(SECRET);
    let escrow = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();
    let recipient = Pubkey::new_unique();

    let settlement = h
        .machine()
        .redeem(&escrow, SECRET, &recipient, NOW + 3_599)
        .unwrap();

    assert_eq!(
        settlement,
        Settlement {
            status: EscrowStatus::Redeemed,
            destination: recipient,
            amount: AMOUNT,
        }
    );
    assert_eq!(h.balance(&AssetKind::Native, &recipient), AMOUNT);
    assert_eq!(h.balance(&AssetKind::Native, &escrow), 0);

    let sender = h.sender;
    let record = h
        .machine()
        .lookup(&EscrowSeeds::Native { sender, digest })
        .unwrap();
    assert_eq!(record.status, EscrowStatus::Redeemed);

    assert_eq!(
        h.machine().redeem(&escrow, SECRET, &recipient, NOW + 3_599),
        Err(EscrowError::EscrowNotActive.into())
    );
    assert_eq!(h.balance(&AssetKind::Native, &recipient), AMOUNT);
}

#[test]
fn test_zero_amount_creates_nothing() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let digest = commit(SECRET);

    assert_eq!(
        h.lock(AssetKind::Native, 0, &digest),
        Err(EscrowError::ZeroAmount.into())
    );

    let sender = h.sender;
    assert_eq!(
        h.machine().lookup(&EscrowSeeds::Native { sender, digest }),
        Err(EscrowError::EscrowNotFound.into())
    );
    assert!(h.ledger.is_empty());
    assert_eq!(h.balance(&AssetKind::Native, &sender), AMOUNT);
}

#[test]
fn test_reclaim_only_at_or_after_expiration() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let digest = commit(SECRET);
    let escrow = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();
    let sender = h.sender;

    assert_eq!(
        h.machine().reclaim(&escrow, &sender, NOW + 3_599),
        Err(EscrowError::EscrowNotExpired.into())
    );
    assert_eq!(h.balance(&AssetKind::Native, &escrow), AMOUNT);

    let settlement = h.machine().reclaim(&escrow, &sender, NOW + 3_600).unwrap();
    assert_eq!(settlement.status, EscrowStatus::Reclaimed);
    assert_eq!(settlement.destination, sender);
    assert_eq!(h.balance(&AssetKind::Native, &sender), AMOUNT);
    assert_eq!(h.balance(&AssetKind::Native, &escrow), 0);
}

#[test]
fn test_redeemed_and_reclaimed_are_exclusive() {
    let mut h = Harness::new(AssetKind::Native, 2 * AMOUNT);
    let sender = h.sender;
    let recipient = Pubkey::new_unique();

    let redeemed = h.lock(AssetKind::Native, AMOUNT, &commit(b"one")).unwrap();
    h.machine()
        .redeem(&redeemed, b"one", &recipient, NOW + 1)
        .unwrap();
    assert_eq!(
        h.machine().reclaim(&redeemed, &sender, NOW + 7_200),
        Err(EscrowError::EscrowNotActive.into())
    );

    let reclaimed = h.lock(AssetKind::Native, AMOUNT, &commit(b"two")).unwrap();
    h.machine()
        .reclaim(&reclaimed, &sender, NOW + 7_200)
        .unwrap();
    assert_eq!(
        h.machine().redeem(&reclaimed, b"two", &recipient, NOW + 1),
        Err(EscrowError::EscrowNotActive.into())
    );
    assert_eq!(
        h.machine().reclaim(&reclaimed, &sender, NOW + 7_200),
        Err(EscrowError::EscrowNotActive.into())
    );

    assert_eq!(h.balance(&AssetKind::Native, &recipient), AMOUNT);
    assert_eq!(h.balance(&AssetKind::Native, &sender), AMOUNT);
}

#[test]
fn test_active_escrow_cannot_be_reinitialized() {
    let mut h = Harness::new(AssetKind::Native, 2 * AMOUNT);
    let digest = commit(SECRET);
    let escrow = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();

    assert_eq!(
        h.lock(AssetKind::Native, AMOUNT, &digest),
        Err(EscrowError::EscrowAlreadyExists.into())
    );
    assert_eq!(h.balance(&AssetKind::Native, &escrow), AMOUNT);

    // A settled escrow frees its address for a new lock.
    h.machine()
        .redeem(&escrow, SECRET, &Pubkey::new_unique(), NOW + 1)
        .unwrap();
    assert_eq!(h.lock(AssetKind::Native, AMOUNT, &digest), Ok(escrow));
}

#[test]
fn test_insufficient_funds_leaves_no_record() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT - 1);
    let digest = commit(SECRET);

    assert_eq!(
        h.lock(AssetKind::Native, AMOUNT, &digest),
        Err(EscrowError::InsufficientFunds.into())
    );
    assert!(h.ledger.is_empty());
    let sender = h.sender;
    assert_eq!(h.balance(&AssetKind::Native, &sender), AMOUNT - 1);
}

#[test]
fn test_unfunded_sender_is_account_not_found() {
    let mint = AssetKind::Fungible(Pubkey::new_unique());
    let mut h = Harness::new(mint, AMOUNT);

    assert_eq!(
        h.lock(AssetKind::Native, AMOUNT, &commit(SECRET)),
        Err(EscrowError::AccountNotFound.into())
    );
    assert!(h.ledger.is_empty());
}

#[test]
fn test_fungible_escrow_round_trip() {
    let mint = Pubkey::new_unique();
    let asset = AssetKind::Fungible(mint);
    let mut h = Harness::new(asset, 1_000);
    let digest = commit(SECRET);

    let escrow = h.lock(asset, 750, &digest).unwrap();
    let record = h
        .machine()
        .lookup(&EscrowSeeds::Fungible { digest })
        .unwrap();
    assert_ne!(record.holding_account, escrow);
    assert_eq!(h.balance(&asset, &record.holding_account), 750);
    assert_eq!(h.balance(&AssetKind::Native, &escrow), 0);

    let relayer_named = Pubkey::new_unique();
    assert_eq!(
        h.machine()
            .redeem(&escrow, b"guess", &relayer_named, NOW + 10),
        Err(EscrowError::SecretMismatch.into())
    );
    h.machine()
        .redeem(&escrow, SECRET, &relayer_named, NOW + 10)
        .unwrap();

    assert_eq!(h.balance(&asset, &relayer_named), 750);
    assert_eq!(h.balance(&asset, &record.holding_account), 0);
    let sender = h.sender;
    assert_eq!(h.balance(&asset, &sender), 250);
}

#[test]
fn test_native_and_fungible_escrows_do_not_collide() {
    let mint = AssetKind::Fungible(Pubkey::new_unique());
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let sender = h.sender;
    h.bank.deposit(mint, sender, AMOUNT).unwrap();
    let digest = commit(SECRET);

    let native = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();
    let fungible = h.lock(mint, AMOUNT, &digest).unwrap();
    assert_ne!(native, fungible);
}

#[test]
fn test_redeem_after_expiration_routes_to_reclaim() {
    let mut h = Harness::new(AssetKind::Native, AMOUNT);
    let digest = commit(SECRET);
    let escrow = h.lock(AssetKind::Native, AMOUNT, &digest).unwrap();

    assert_eq!(
        h.machine()
            .redeem(&escrow, SECRET, &Pubkey::new_unique(), NOW + 3_600),
        Err(EscrowError::EscrowExpired.into())
    );
    let sender = h.sender;
    assert!(h.machine().reclaim(&escrow, &sender, NOW + 3_600).is_ok());
}

proptest! {
    #[test]
    fn test_redeem_succeeds_iff_preimage_and_before_expiration(
        secret in proptest::collection::vec(any::<u8>(), 1..48),
        guess in proptest::collection::vec(any::<u8>(), 1..48),
        offset in 0i64..7_200,
    ) {
        let mut h = Harness::new(AssetKind::Native, AMOUNT);
        let escrow = h.lock(AssetKind::Native, AMOUNT, &commit(&secret)).unwrap();
        let recipient = Pubkey::new_unique();
        let now = NOW + offset;

        let result = h.machine().redeem(&escrow, &guess, &recipient, now);

        if now >= NOW + 3_600 {
            prop_assert_eq!(result, Err(EscrowError::EscrowExpired.into()));
        } else if guess != secret {
            prop_assert_eq!(result, Err(EscrowError::SecretMismatch.into()));
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(h.balance(&AssetKind::Native, &recipient), AMOUNT);
        }
    }
}
