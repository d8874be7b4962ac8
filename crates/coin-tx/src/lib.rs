//! coin-tx: Transaction building utilities
//!
//! Instructions are plain values. A [`Message`] is the compiled form the
//! wallet signs; it can be decompiled back to instructions, merged with other
//! messages and recompiled without losing per-account signer/writable flags.

pub mod instruction;
pub mod message;
pub mod shortvec;
pub mod token;
pub mod transaction;

pub use instruction::{compute_budget, AccountMeta, Instruction, COMPUTE_BUDGET_PROGRAM_ID};
pub use message::{AddressTableLookup, CompiledInstruction, Message, MessageHeader, MessageVersion};
pub use token::{transfer_checked, TOKEN_PROGRAM_ID};
pub use transaction::{SignedTransaction, UnsignedTransaction, SIGNATURE_BYTES};
