use anyhow::{anyhow, Context};
use codec::Decode;
use futures::StreamExt;
use subxt::{
    dynamic::Value,
    ext::{
        sp_core::{sr25519, H256},
        sp_runtime::AccountId32,
    },
    tx::PairSigner,
    OnlineClient,
    PolkadotConfig,
};

use crate::keys;
use crate::subscription::Subscription;

#[derive(Debug, Default, Clone, PartialEq, Eq, Decode)]
pub struct AccountData {
    pub free: u128,
    pub reserved: u128,
    pub misc_frozen: u128,
    pub fee_frozen: u128,
}

/// `System.Account` value.
#[derive(Debug, Default, Clone, PartialEq, Eq, Decode)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
    pub data: AccountData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub block_hash: H256,
    pub free: u128,
}

pub fn account_key(account: &AccountId32) -> Vec<u8> {
    let mut key = keys::storage_prefix("System", "Account");
    key.extend(keys::blake2_128_concat(account));
    key
}

pub fn existential_deposit(api: &OnlineClient<PolkadotConfig>) -> anyhow::Result<u128> {
    let address = subxt::dynamic::constant("Balances", "ExistentialDeposit");
    let value = api.constants().at(&address)?;
    value
        .as_u128()
        .ok_or_else(|| anyhow!("Balances.ExistentialDeposit is not an unsigned integer"))
}

/// Account state at block `at` (latest when `None`). Accounts that do not
/// exist read as zero.
pub async fn account_info(
    api: &OnlineClient<PolkadotConfig>,
    account: &AccountId32,
    at: Option<H256>,
) -> anyhow::Result<AccountInfo> {
    let key = account_key(account);
    let raw = api
        .storage()
        .fetch_raw(&key, at)
        .await
        .with_context(|| format!("failed to query account {}", account))?;
    match raw {
        Some(bytes) => AccountInfo::decode(&mut &bytes[..]).with_context(|| format!("failed to decode account {}", account)),
        None => Ok(AccountInfo::default()),
    }
}

pub async fn free_balance(
    api: &OnlineClient<PolkadotConfig>,
    account: &AccountId32,
    at: Option<H256>,
) -> anyhow::Result<u128> {
    Ok(account_info(api, account, at).await?.data.free)
}

/// Signs and submits `Balances.transfer`, returning the extrinsic hash once
/// it is finalized successfully.
pub async fn transfer(
    api: &OnlineClient<PolkadotConfig>,
    from: &sr25519::Pair,
    to: &AccountId32,
    amount: u128,
) -> anyhow::Result<H256> {
    let tx = subxt::dynamic::tx(
        "Balances",
        "transfer",
        vec![
            Value::unnamed_variant("Id", [Value::from_bytes(to)]),
            Value::u128(amount),
        ],
    );
    let signer = PairSigner::<PolkadotConfig, _>::new(from.clone());
    let events = api
        .tx()
        .sign_and_submit_then_watch_default(&tx, &signer)
        .await?
        .wait_for_finalized_success()
        .await
        .context("transfer was not finalized successfully")?;
    Ok(events.extrinsic_hash())
}

/// Emits the account's free balance on every finalized block where it
/// differs from the last emitted value. The first value is always emitted.
pub async fn subscribe_balance(
    api: &OnlineClient<PolkadotConfig>,
    account: AccountId32,
) -> anyhow::Result<Subscription<BalanceUpdate>> {
    let mut blocks = api.events().subscribe_finalized().await?;
    let api = api.clone();
    Ok(Subscription::spawn(move |tx| async move {
        let mut last = None;
        while let Some(events) = blocks.next().await {
            let block_hash = events.context("balance subscription lost the block stream")?.block_hash();
            let free = free_balance(&api, &account, Some(block_hash)).await?;
            if last == Some(free) {
                continue;
            }
            last = Some(free);
            if tx.send(BalanceUpdate { block_hash, free }).is_err() {
                break;
            }
        }
        Ok::<_, anyhow::Error>(())
    }))
}

/// Renders a raw balance with four fractional digits, e.g. `1.0000 Unit`.
pub fn pretty_balance(amount: u128, decimals: u8, symbol: &str) -> String {
    let unit = 10u128.pow(u32::from(decimals.min(38)));
    let whole = amount / unit;
    let fraction = if unit >= 10_000 {
        (amount % unit) / (unit / 10_000)
    } else {
        (amount % unit) * 10_000 / unit
    };
    format!("{}.{:04} {}", whole, fraction, symbol)
}
