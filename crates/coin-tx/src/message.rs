//! Compiled messages
//!
//! A message is the signable body of a transaction: a deduplicated account
//! list ordered by privilege, a recent blockhash, and instructions that refer
//! to accounts by index. The header counts encode which accounts sign and
//! which are writable, so decompiling recovers every `AccountMeta` exactly.
//!
//! v0 messages may additionally load accounts from address lookup tables.
//! Those decode, re-encode and sign like legacy messages, but cannot be
//! decompiled without the table contents.

use coin_core::{Address, Blockhash, TxError, PUBKEY_BYTES};
use serde::{Deserialize, Serialize};

use crate::instruction::{compute_budget, AccountMeta, Instruction};
use crate::shortvec::{encode_len, ByteReader};

/// Maximum number of accounts addressable by a one-byte index
pub const MAX_ACCOUNTS: usize = 256;

/// High bit of the first message byte marks a versioned message
const VERSION_PREFIX_MASK: u8 = 0x80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVersion {
    #[default]
    Legacy,
    V0,
}

/// Accounts a v0 message loads from one lookup table, by table index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressTableLookup {
    pub account_key: Address,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
    #[serde(default)]
    pub address_table_lookups: Vec<AddressTableLookup>,
}

/// Account collected during compilation
struct KeyEntry {
    key: Address,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile instructions into a message paid for by `payer`.
    ///
    /// Accounts are deduplicated with their signer/writable flags OR-ed
    /// together, then ordered: writable signers (payer first), readonly
    /// signers, writable non-signers, readonly non-signers.
    pub fn compile(
        instructions: &[Instruction],
        payer: &Address,
        recent_blockhash: Blockhash,
    ) -> Result<Self, TxError> {
        let mut entries: Vec<KeyEntry> = vec![KeyEntry {
            key: payer.clone(),
            is_signer: true,
            is_writable: true,
        }];

        let mut upsert = |key: &Address, is_signer: bool, is_writable: bool| {
            match entries.iter_mut().find(|e| e.key == *key) {
                Some(entry) => {
                    entry.is_signer |= is_signer;
                    entry.is_writable |= is_writable;
                }
                None => entries.push(KeyEntry {
                    key: key.clone(),
                    is_signer,
                    is_writable,
                }),
            }
        };

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(&meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(&ix.program_id, false, false);
        }

        if entries.len() > MAX_ACCOUNTS {
            return Err(TxError::TooManyAccounts {
                count: entries.len(),
            });
        }
        for entry in &entries {
            entry.key.to_bytes()?;
        }
        recent_blockhash.to_bytes()?;

        let group = |signer: bool, writable: bool| {
            entries
                .iter()
                .filter(move |e| e.is_signer == signer && e.is_writable == writable)
        };
        let writable_signed: Vec<&KeyEntry> = group(true, true).collect();
        let readonly_signed: Vec<&KeyEntry> = group(true, false).collect();
        let writable_unsigned: Vec<&KeyEntry> = group(false, true).collect();
        let readonly_unsigned: Vec<&KeyEntry> = group(false, false).collect();

        let count = |n: usize| u8::try_from(n).map_err(|_| TxError::TooManyAccounts { count: n });
        let header = MessageHeader {
            num_required_signatures: count(writable_signed.len() + readonly_signed.len())?,
            num_readonly_signed_accounts: count(readonly_signed.len())?,
            num_readonly_unsigned_accounts: count(readonly_unsigned.len())?,
        };

        let account_keys: Vec<Address> = writable_signed
            .into_iter()
            .chain(readonly_signed)
            .chain(writable_unsigned)
            .chain(readonly_unsigned)
            .map(|e| e.key.clone())
            .collect();

        let index_of = |key: &Address| -> Result<u8, TxError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| TxError::Malformed {
                    message: format!("account {} missing from compiled keys", key),
                })
        };

        let compiled = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|meta| index_of(&meta.pubkey))
                        .collect::<Result<Vec<u8>, TxError>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, TxError>>()?;

        Ok(Self {
            version: MessageVersion::Legacy,
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
            address_table_lookups: Vec::new(),
        })
    }

    /// Number of accounts loaded through lookup tables
    pub fn loaded_account_count(&self) -> usize {
        self.address_table_lookups
            .iter()
            .map(|l| l.writable_indexes.len() + l.readonly_indexes.len())
            .sum()
    }

    /// Whether any instruction's program is `program_id`. Programs are never
    /// loaded from lookup tables, so this needs no table contents.
    pub fn invokes(&self, program_id: &str) -> bool {
        self.instructions.iter().any(|ix| {
            self.account_keys
                .get(usize::from(ix.program_id_index))
                .is_some_and(|key| key.as_str() == program_id)
        })
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < usize::from(self.header.num_required_signatures)
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let required = usize::from(self.header.num_required_signatures);
        if index >= self.account_keys.len() {
            return false;
        }
        if index < required {
            index < required.saturating_sub(usize::from(self.header.num_readonly_signed_accounts))
        } else {
            index
                < self
                    .account_keys
                    .len()
                    .saturating_sub(usize::from(self.header.num_readonly_unsigned_accounts))
        }
    }

    /// First account, if the message requires any signature
    pub fn fee_payer(&self) -> Option<&Address> {
        if self.header.num_required_signatures == 0 {
            return None;
        }
        self.account_keys.first()
    }

    /// Accounts whose signatures the message requires, in signature order
    pub fn signers(&self) -> &[Address] {
        let n = usize::from(self.header.num_required_signatures).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    fn key_at(&self, index: u8) -> Result<&Address, TxError> {
        let index = usize::from(index);
        let len = self.account_keys.len();
        match self.account_keys.get(index) {
            Some(key) => Ok(key),
            None if index < len + self.loaded_account_count() => {
                Err(TxError::UnresolvedLookup { index })
            }
            None => Err(TxError::AccountIndexOutOfRange {
                index,
                len: len + self.loaded_account_count(),
            }),
        }
    }

    /// Expand compiled instructions back to explicit instructions, restoring
    /// each account's signer/writable flags from the header
    pub fn decompile(&self) -> Result<Vec<Instruction>, TxError> {
        self.instructions
            .iter()
            .map(|ix| {
                let program_id = self.key_at(ix.program_id_index)?.clone();
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|&i| {
                        let pubkey = self.key_at(i)?.clone();
                        let idx = usize::from(i);
                        Ok(AccountMeta {
                            pubkey,
                            is_signer: self.is_signer(idx),
                            is_writable: self.is_writable(idx),
                        })
                    })
                    .collect::<Result<Vec<_>, TxError>>()?;
                Ok(Instruction {
                    program_id,
                    accounts,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }

    /// Merge several messages into one, in order, under a single payer and
    /// blockhash.
    ///
    /// Compute-budget instructions are combined and placed first: unit
    /// limits are summed (capped at the runtime maximum), the highest unit
    /// price wins, and any other budget instruction is kept once.
    pub fn merge(
        messages: &[Message],
        payer: &Address,
        recent_blockhash: Blockhash,
    ) -> Result<Self, TxError> {
        let mut unit_limit: Option<u32> = None;
        let mut unit_price: Option<u64> = None;
        let mut other_budget: Vec<Instruction> = Vec::new();
        let mut body = Vec::new();

        for message in messages {
            for ix in message.decompile()? {
                if let Some(units) = ix.compute_unit_limit() {
                    unit_limit = Some(unit_limit.unwrap_or(0).saturating_add(units));
                } else if let Some(price) = ix.compute_unit_price() {
                    unit_price = Some(unit_price.map_or(price, |p| p.max(price)));
                } else if ix.is_compute_budget() {
                    if other_budget.iter().any(|o| o.data.first() == ix.data.first()) {
                        tracing::debug!(
                            "Dropping duplicate compute budget instruction data={}",
                            hex::encode(&ix.data)
                        );
                    } else {
                        other_budget.push(ix);
                    }
                } else {
                    body.push(ix);
                }
            }
        }

        let mut instructions = Vec::with_capacity(body.len() + other_budget.len() + 2);
        if let Some(units) = unit_limit {
            let units = units.min(compute_budget::MAX_COMPUTE_UNIT_LIMIT);
            tracing::debug!("Merged compute unit limit {}", units);
            instructions.push(Instruction::set_compute_unit_limit(units));
        }
        if let Some(price) = unit_price {
            instructions.push(Instruction::set_compute_unit_price(price));
        }
        instructions.extend(other_budget);
        instructions.extend(body);

        Self::compile(&instructions, payer, recent_blockhash)
    }

    /// Recompile with extra instructions appended after the existing ones.
    /// The result is a legacy message.
    pub fn append_instructions(
        &self,
        extra: Vec<Instruction>,
        payer: &Address,
    ) -> Result<Self, TxError> {
        let mut instructions = self.decompile()?;
        instructions.extend(extra);
        Self::compile(&instructions, payer, self.recent_blockhash.clone())
    }

    /// Wire encoding, with the version prefix and lookups for v0
    pub fn serialize(&self) -> Result<Vec<u8>, TxError> {
        let mut bytes = Vec::new();
        if self.version == MessageVersion::V0 {
            bytes.push(VERSION_PREFIX_MASK);
        }
        bytes.extend_from_slice(&[
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ]);

        encode_len(&mut bytes, self.account_keys.len())?;
        for key in &self.account_keys {
            bytes.extend_from_slice(&key.to_bytes()?);
        }
        bytes.extend_from_slice(&self.recent_blockhash.to_bytes()?);

        encode_len(&mut bytes, self.instructions.len())?;
        for ix in &self.instructions {
            bytes.push(ix.program_id_index);
            encode_len(&mut bytes, ix.accounts.len())?;
            bytes.extend_from_slice(&ix.accounts);
            encode_len(&mut bytes, ix.data.len())?;
            bytes.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            encode_len(&mut bytes, self.address_table_lookups.len())?;
            for lookup in &self.address_table_lookups {
                bytes.extend_from_slice(&lookup.account_key.to_bytes()?);
                encode_len(&mut bytes, lookup.writable_indexes.len())?;
                bytes.extend_from_slice(&lookup.writable_indexes);
                encode_len(&mut bytes, lookup.readonly_indexes.len())?;
                bytes.extend_from_slice(&lookup.readonly_indexes);
            }
        }
        Ok(bytes)
    }

    /// Decode a complete legacy or v0 message
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut reader = ByteReader::new(bytes);
        let message = Self::read_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(TxError::Malformed {
                message: "trailing bytes after message".to_string(),
            });
        }
        Ok(message)
    }

    pub(crate) fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, TxError> {
        let first = reader.read_u8()?;
        let (version, first) = if first & VERSION_PREFIX_MASK == 0 {
            (MessageVersion::Legacy, first)
        } else if first == VERSION_PREFIX_MASK {
            (MessageVersion::V0, reader.read_u8()?)
        } else {
            return Err(TxError::UnsupportedVersion { prefix: first });
        };
        let header = MessageHeader {
            num_required_signatures: first,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        };

        let key_count = reader.read_len()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(Address::from_bytes(&reader.read_array::<PUBKEY_BYTES>()?));
        }
        let recent_blockhash = Blockhash::from_bytes(&reader.read_array::<PUBKEY_BYTES>()?);

        let ix_count = reader.read_len()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = reader.read_u8()?;
            let n = reader.read_len()?;
            let accounts = reader.read_bytes(n)?.to_vec();
            let n = reader.read_len()?;
            let data = reader.read_bytes(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let mut address_table_lookups = Vec::new();
        if version == MessageVersion::V0 {
            let lookup_count = reader.read_len()?;
            for _ in 0..lookup_count {
                let account_key = Address::from_bytes(&reader.read_array::<PUBKEY_BYTES>()?);
                let n = reader.read_len()?;
                let writable_indexes = reader.read_bytes(n)?.to_vec();
                let n = reader.read_len()?;
                let readonly_indexes = reader.read_bytes(n)?.to_vec();
                address_table_lookups.push(AddressTableLookup {
                    account_key,
                    writable_indexes,
                    readonly_indexes,
                });
            }
        }

        let message = Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        };
        message.validate()?;
        Ok(message)
    }

    /// Structural checks on decoded messages
    fn validate(&self) -> Result<(), TxError> {
        let len = self.account_keys.len();
        let required = usize::from(self.header.num_required_signatures);
        if required == 0 {
            return Err(TxError::MissingFeePayer);
        }
        if required > len
            || usize::from(self.header.num_readonly_signed_accounts) >= required
            || usize::from(self.header.num_readonly_unsigned_accounts) > len - required
        {
            return Err(TxError::Malformed {
                message: format!(
                    "header {:?} inconsistent with {} account keys",
                    self.header, len
                ),
            });
        }
        let total = len + self.loaded_account_count();
        for ix in &self.instructions {
            if usize::from(ix.program_id_index) >= len {
                return Err(TxError::AccountIndexOutOfRange {
                    index: usize::from(ix.program_id_index),
                    len,
                });
            }
            for &index in &ix.accounts {
                if usize::from(index) >= total {
                    return Err(TxError::AccountIndexOutOfRange {
                        index: usize::from(index),
                        len: total,
                    });
                }
            }
        }
        Ok(())
    }
}
