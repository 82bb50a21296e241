//! Hash-time-locked escrow program.
//!
//! A sender locks lamports or SPL tokens at a program derived address tagged
//! with the SHA-256 digest of a secret and an expiration time. Anyone holding
//! the secret can redeem before expiration; afterwards the sender reclaims.

pub mod adapter;
pub mod commitment;
pub mod entrypoint;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod machine;
pub mod memory;
pub mod pda;
pub mod processor;
pub mod state;
pub mod transfer;
