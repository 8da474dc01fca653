use std::collections::HashSet;
use std::io::Write;

use anyhow::Context;
use async_trait::async_trait;
use codec::{Decode, Encode};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use subxt::{ext::sp_runtime::AccountId32, OnlineClient, PolkadotConfig};

use crate::consts::*;
use crate::keys;

/// A staked amount and its owner, as stored by the staking pallet.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Bond {
    pub owner: AccountId32,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Delegations {
    pub delegations: Vec<Bond>,
    pub total: u128,
}

/// Read access to the staking pallet, in textual (JSON) form.
#[async_trait]
pub trait StakingSource {
    async fn candidate_pool(&self) -> anyhow::Result<String>;
    /// `None` when the collator has no delegations record.
    async fn top_delegations(&self, collator: &str) -> anyhow::Result<Option<String>>;
}

pub struct ChainStakingSource<'a> {
    api: &'a OnlineClient<PolkadotConfig>,
    ss58_prefix: u16,
}

impl<'a> ChainStakingSource<'a> {
    pub fn new(api: &'a OnlineClient<PolkadotConfig>, ss58_prefix: u16) -> Self {
        Self { api, ss58_prefix }
    }
}

#[async_trait]
impl<'a> StakingSource for ChainStakingSource<'a> {
    async fn candidate_pool(&self) -> anyhow::Result<String> {
        let key = candidate_pool_key();
        let raw = self
            .api
            .storage()
            .fetch_raw(&key, None)
            .await
            .context("failed to query candidate pool")?;
        let pool = match raw {
            Some(bytes) => Vec::<Bond>::decode(&mut &bytes[..]).context("failed to decode candidate pool")?,
            None => Vec::new(),
        };
        render_bonds(&pool, self.ss58_prefix)
    }

    async fn top_delegations(&self, collator: &str) -> anyhow::Result<Option<String>> {
        let account = keys::parse_address(collator)?;
        let key = top_delegations_key(&account);
        let raw = self
            .api
            .storage()
            .fetch_raw(&key, None)
            .await
            .with_context(|| format!("failed to query top delegations of {}", collator))?;
        raw.map(|bytes| {
            let delegations = Delegations::decode(&mut &bytes[..])
                .with_context(|| format!("failed to decode top delegations of {}", collator))?;
            render_delegations(&delegations, self.ss58_prefix)
        })
        .transpose()
    }
}

pub fn candidate_pool_key() -> Vec<u8> {
    keys::storage_prefix(STAKING_PALLET, CANDIDATE_POOL)
}

pub fn top_delegations_key(collator: &AccountId32) -> Vec<u8> {
    let mut key = keys::storage_prefix(STAKING_PALLET, TOP_DELEGATIONS);
    key.extend(keys::twox_64_concat(collator));
    key
}

#[derive(Serialize)]
struct BondJson {
    owner: String,
    amount: u128,
}

#[derive(Serialize)]
struct DelegationsJson {
    delegations: Vec<BondJson>,
    total: u128,
}

/// Only the owner is read back; amounts may be numbers or hex strings.
#[derive(Deserialize)]
struct BondRecord {
    owner: String,
}

#[derive(Deserialize)]
struct DelegationsRecord {
    #[serde(default)]
    delegations: Vec<BondRecord>,
}

fn bond_json(bond: &Bond, ss58_prefix: u16) -> BondJson {
    BondJson {
        owner: keys::to_address(&bond.owner, ss58_prefix),
        amount: bond.amount,
    }
}

pub fn render_bonds(bonds: &[Bond], ss58_prefix: u16) -> anyhow::Result<String> {
    let records: Vec<_> = bonds.iter().map(|b| bond_json(b, ss58_prefix)).collect();
    Ok(serde_json::to_string(&records)?)
}

pub fn render_delegations(delegations: &Delegations, ss58_prefix: u16) -> anyhow::Result<String> {
    let record = DelegationsJson {
        delegations: delegations.delegations.iter().map(|b| bond_json(b, ss58_prefix)).collect(),
        total: delegations.total,
    };
    Ok(serde_json::to_string(&record)?)
}

/// Owners of a candidate pool, in pool order.
pub fn parse_candidate_pool(raw: &str) -> anyhow::Result<Vec<String>> {
    let records: Vec<BondRecord> = serde_json::from_str(raw).context("malformed candidate pool")?;
    Ok(records.into_iter().map(|r| r.owner).collect())
}

/// Owners of a top delegations record, in record order.
pub fn parse_top_delegations(raw: &str) -> anyhow::Result<Vec<String>> {
    let record: DelegationsRecord = serde_json::from_str(raw).context("malformed top delegations")?;
    Ok(record.delegations.into_iter().map(|r| r.owner).collect())
}

/// Drops repeated owners, keeping the first appearance of each.
pub fn dedup_owners<I: IntoIterator<Item = String>>(owners: I) -> Vec<String> {
    let mut seen = HashSet::new();
    owners.into_iter().filter(|owner| seen.insert(owner.clone())).collect()
}

pub async fn collect_collators<S: StakingSource + ?Sized>(source: &S) -> anyhow::Result<Vec<String>> {
    let raw = source.candidate_pool().await?;
    let collators = parse_candidate_pool(&raw)?;
    tracing::info!(count = collators.len(), "fetched candidate pool");
    Ok(collators)
}

/// Fetches the top delegations of every collator and returns the distinct
/// delegators. At most `concurrency` queries run at once; results are consumed
/// in collator order so the output does not depend on it.
pub async fn collect_delegators<S: StakingSource + ?Sized>(
    source: &S,
    collators: &[String],
    concurrency: usize,
) -> anyhow::Result<Vec<String>> {
    let per_collator: Vec<Vec<String>> = stream::iter(collators)
        .map(move |collator| async move {
            let owners = match source.top_delegations(collator).await? {
                Some(raw) => parse_top_delegations(&raw)
                    .with_context(|| format!("bad top delegations of {}", collator))?,
                None => Vec::new(),
            };
            tracing::debug!(%collator, count = owners.len(), "fetched top delegations");
            Ok::<_, anyhow::Error>(owners)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    Ok(dedup_owners(per_collator.into_iter().flatten()))
}

/// Collators and distinct delegators selected for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationAccounts {
    pub collators: Vec<String>,
    pub delegators: Vec<String>,
}

/// Prints the fetched collator list, swaps in `collator_override` when given,
/// collects the delegators of the resulting collators and prints both counts.
pub async fn gather_accounts<S, W>(
    source: &S,
    collator_override: Option<&[String]>,
    concurrency: usize,
    out: &mut W,
) -> anyhow::Result<MigrationAccounts>
where
    S: StakingSource + ?Sized,
    W: Write + ?Sized,
{
    let fetched = collect_collators(source).await?;
    writeln!(out, "{:?}", fetched)?;
    let collators = match collator_override {
        Some(list) => {
            tracing::warn!(count = list.len(), "replacing fetched collators with CollatorOverride");
            list.to_vec()
        }
        None => fetched,
    };

    let delegators = collect_delegators(source, &collators, concurrency).await?;
    writeln!(out, "collator length: {}", collators.len())?;
    writeln!(out, "delegator length: {}", delegators.len())?;
    Ok(MigrationAccounts { collators, delegators })
}
