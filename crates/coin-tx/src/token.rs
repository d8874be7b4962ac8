//! SPL token instructions

use coin_core::{Address, RawAmount};

use crate::instruction::{AccountMeta, Instruction};

/// SPL token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// `TransferChecked` discriminator
const TRANSFER_CHECKED: u8 = 12;

/// Transfer `amount` of `mint` from `source` to `destination`, with the
/// program verifying the mint's decimals.
///
/// Accounts: source (writable), mint, destination (writable), owner (signer).
pub fn transfer_checked(
    source: &Address,
    mint: &Address,
    destination: &Address,
    owner: &Address,
    amount: RawAmount,
    decimals: u8,
) -> Instruction {
    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Instruction::new(
        Address::new(TOKEN_PROGRAM_ID),
        vec![
            AccountMeta::new(source.clone(), false),
            AccountMeta::new_readonly(mint.clone(), false),
            AccountMeta::new(destination.clone(), false),
            AccountMeta::new_readonly(owner.clone(), true),
        ],
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_checked_layout() {
        let source = Address::from_bytes(&[1u8; 32]);
        let mint = Address::from_bytes(&[2u8; 32]);
        let dest = Address::from_bytes(&[3u8; 32]);
        let owner = Address::from_bytes(&[4u8; 32]);

        let ix = transfer_checked(&source, &mint, &dest, &owner, 70, 9);

        assert_eq!(ix.program_id.as_str(), TOKEN_PROGRAM_ID);
        assert_eq!(hex::encode(&ix.data), "0c460000000000000009");
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(!ix.accounts[1].is_writable);
        assert!(ix.accounts[2].is_writable);
        assert!(ix.accounts[3].is_signer && !ix.accounts[3].is_writable);
    }

    #[test]
    fn test_token_program_id_is_valid_key() {
        assert!(Address::new(TOKEN_PROGRAM_ID).is_valid());
    }
}
