use std::io::Write;

use anyhow::Context;
use codec::Encode;
use subxt::{
    dynamic::Value,
    ext::sp_runtime::AccountId32,
    tx::TxPayload,
    OnlineClient,
    PolkadotConfig,
};

use crate::config::CallIndices;
use crate::consts::*;
use crate::keys;

/// A staking pallet call moving accounts from reserve to locks accounting.
#[derive(Debug, Clone, Copy)]
pub enum MigrationCall<'a> {
    Collators(&'a [AccountId32]),
    Delegators(&'a [AccountId32]),
}

impl<'a> MigrationCall<'a> {
    pub fn call_name(&self) -> &'static str {
        match self {
            MigrationCall::Collators(_) => MIGRATE_COLLATORS_CALL,
            MigrationCall::Delegators(_) => MIGRATE_DELEGATORS_CALL,
        }
    }

    pub fn accounts(&self) -> &'a [AccountId32] {
        match *self {
            MigrationCall::Collators(accounts) | MigrationCall::Delegators(accounts) => accounts,
        }
    }
}

/// Turns a call into its SCALE encoded call data.
pub trait CallEncoder {
    fn encode_call(&self, call: &MigrationCall<'_>) -> anyhow::Result<Vec<u8>>;
}

/// Resolves pallet and call indices from the connected node's metadata.
pub struct MetadataCallEncoder<'a> {
    api: &'a OnlineClient<PolkadotConfig>,
}

impl<'a> MetadataCallEncoder<'a> {
    pub fn new(api: &'a OnlineClient<PolkadotConfig>) -> Self {
        Self { api }
    }
}

impl CallEncoder for MetadataCallEncoder<'_> {
    fn encode_call(&self, call: &MigrationCall<'_>) -> anyhow::Result<Vec<u8>> {
        let accounts: Vec<Value> = call.accounts().iter().map(Value::from_bytes).collect();
        let tx = subxt::dynamic::tx(
            STAKING_PALLET,
            call.call_name(),
            vec![Value::unnamed_composite(accounts)],
        );
        let mut call_data = Vec::new();
        tx.encode_call_data(&self.api.metadata(), &mut call_data)
            .with_context(|| format!("failed to encode {}", call.call_name()))?;
        Ok(call_data)
    }
}

/// Offline encoding: `[pallet, call] ++ SCALE(Vec<AccountId>)`.
impl CallEncoder for CallIndices {
    fn encode_call(&self, call: &MigrationCall<'_>) -> anyhow::Result<Vec<u8>> {
        let call_index = match call {
            MigrationCall::Collators(_) => self.collators,
            MigrationCall::Delegators(_) => self.delegators,
        };
        let mut call_data = vec![self.pallet, call_index];
        call.accounts().encode_to(&mut call_data);
        Ok(call_data)
    }
}

/// One encoded call and the number of accounts it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub count: usize,
    pub call_data: Vec<u8>,
}

impl Payload {
    pub fn hex(&self) -> String {
        to_hex(&self.call_data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub collators: Payload,
    /// In batch order; printed with a 1-based index.
    pub delegators: Vec<Payload>,
}

/// Contiguous slices of at most `size` items, in list order.
pub fn batches<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

pub fn build_plan(
    encoder: &dyn CallEncoder,
    collators: &[String],
    delegators: &[String],
    batch_size: usize,
) -> anyhow::Result<MigrationPlan> {
    let collator_ids = keys::parse_addresses(collators)?;
    let delegator_ids = keys::parse_addresses(delegators)?;

    let collators = Payload {
        count: collator_ids.len(),
        call_data: encoder.encode_call(&MigrationCall::Collators(&collator_ids))?,
    };
    let delegators = batches(&delegator_ids, batch_size)
        .map(|batch| {
            Ok(Payload {
                count: batch.len(),
                call_data: encoder.encode_call(&MigrationCall::Delegators(batch))?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    tracing::info!(
        collators = collators.count,
        delegator_batches = delegators.len(),
        "built migration calls"
    );
    Ok(MigrationPlan { collators, delegators })
}

pub fn write_plan<W: Write>(out: &mut W, plan: &MigrationPlan) -> std::io::Result<()> {
    writeln!(out, "# collator count: {}", plan.collators.count)?;
    writeln!(out, "{}", plan.collators.hex())?;
    writeln!(out)?;
    for (i, batch) in plan.delegators.iter().enumerate() {
        writeln!(out, "# delegator {} count {}", i + 1, batch.count)?;
        writeln!(out, "{}", batch.hex())?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).with_context(|| format!("invalid hex string {}", s))
}
