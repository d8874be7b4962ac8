//! Instruction value types

use coin_core::Address;
use serde::{Deserialize, Serialize};

/// Compute budget program; its instructions may appear at most once per
/// merged message
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";

/// Compute budget instruction discriminators
pub mod compute_budget {
    pub const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
    pub const SET_COMPUTE_UNIT_PRICE: u8 = 3;
    /// Per-transaction ceiling enforced by the runtime
    pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;
}

/// One account referenced by an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub pubkey: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// Writable account
    pub fn new(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A program invocation with explicit accounts and opaque data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program_id: Address, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    pub fn is_compute_budget(&self) -> bool {
        self.program_id.as_str() == COMPUTE_BUDGET_PROGRAM_ID
    }

    pub fn set_compute_unit_limit(units: u32) -> Self {
        let mut data = vec![compute_budget::SET_COMPUTE_UNIT_LIMIT];
        data.extend_from_slice(&units.to_le_bytes());
        Self::new(Address::new(COMPUTE_BUDGET_PROGRAM_ID), vec![], data)
    }

    pub fn set_compute_unit_price(micro_lamports: u64) -> Self {
        let mut data = vec![compute_budget::SET_COMPUTE_UNIT_PRICE];
        data.extend_from_slice(&micro_lamports.to_le_bytes());
        Self::new(Address::new(COMPUTE_BUDGET_PROGRAM_ID), vec![], data)
    }

    /// Units requested by a `SetComputeUnitLimit` instruction
    pub fn compute_unit_limit(&self) -> Option<u32> {
        match self.data.split_first() {
            Some((&compute_budget::SET_COMPUTE_UNIT_LIMIT, rest)) if self.is_compute_budget() => {
                Some(u32::from_le_bytes(rest.try_into().ok()?))
            }
            _ => None,
        }
    }

    /// Price set by a `SetComputeUnitPrice` instruction
    pub fn compute_unit_price(&self) -> Option<u64> {
        match self.data.split_first() {
            Some((&compute_budget::SET_COMPUTE_UNIT_PRICE, rest)) if self.is_compute_budget() => {
                Some(u64::from_le_bytes(rest.try_into().ok()?))
            }
            _ => None,
        }
    }
}
