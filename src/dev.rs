//! Balance queries, a transfer and live subscriptions against a development node.

use std::time::Duration;

use anyhow::anyhow;
use subxt::{
    ext::{
        sp_core::{sr25519, Pair},
        sp_runtime::AccountId32,
    },
    OnlineClient,
    PolkadotConfig,
};

use crate::balances;
use crate::config::DevConfig;
use crate::events::{self, EventFilter};

pub fn pair_from_uri(uri: &str) -> anyhow::Result<sr25519::Pair> {
    sr25519::Pair::from_string(uri, None).map_err(|e| anyhow!("invalid key uri {}: {:?}", uri, e))
}

/// Reported when a subscription stops before the watch window closes.
pub fn ended_line(name: &str, reason: Option<anyhow::Error>) -> String {
    match reason {
        Some(err) => format!("{} subscription ended early: {:#}", name, err),
        None => format!("{} subscription ended early", name),
    }
}

pub async fn run(api: &OnlineClient<PolkadotConfig>, config: &DevConfig) -> anyhow::Result<()> {
    let pretty = |amount| balances::pretty_balance(amount, config.token_decimals, &config.token_symbol);

    let from = pair_from_uri(&config.from)?;
    let from_id: AccountId32 = from.public().into();
    let to_id: AccountId32 = pair_from_uri(&config.to)?.public().into();

    println!("const value existentialDeposit is: {}", pretty(balances::existential_deposit(api)?));
    println!("init {} balance is: {}", config.from, pretty(balances::free_balance(api, &from_id, None).await?));
    println!("init {} balance is: {}", config.to, pretty(balances::free_balance(api, &to_id, None).await?));

    let filter = EventFilter {
        pallet: config.event_pallet.clone(),
        variant: config.event_variant.clone(),
    };
    let mut events = events::subscribe_events(api, filter).await?;
    let mut watch_from = balances::subscribe_balance(api, from_id.clone()).await?;
    let mut watch_to = balances::subscribe_balance(api, to_id.clone()).await?;

    let hash = balances::transfer(api, &from, &to_id, config.amount).await?;
    println!("transfer from: {} to: {} finalized in extrinsic {:?}", config.from, config.to, hash);

    let window = tokio::time::sleep(Duration::from_secs(config.watch_secs));
    tokio::pin!(window);
    let (mut events_open, mut from_open, mut to_open) = (true, true, true);
    loop {
        tokio::select! {
            _ = &mut window => break,
            event = events.next(), if events_open => match event {
                Some(event) => println!("{}", event),
                None => {
                    events_open = false;
                    println!("{}", ended_line("event", events.end_reason()));
                }
            },
            update = watch_from.next(), if from_open => match update {
                Some(update) => println!("{} Account subscribed balance: {}", config.from, pretty(update.free)),
                None => {
                    from_open = false;
                    println!("{}", ended_line(&config.from, watch_from.end_reason()));
                }
            },
            update = watch_to.next(), if to_open => match update {
                Some(update) => println!("{} Account subscribed balance: {}", config.to, pretty(update.free)),
                None => {
                    to_open = false;
                    println!("{}", ended_line(&config.to, watch_to.end_reason()));
                }
            },
        }
    }

    watch_from.unsubscribe();
    watch_to.unsubscribe();
    events.unsubscribe();

    println!("after {} balance is: {}", config.from, pretty(balances::free_balance(api, &from_id, None).await?));
    println!("after {} balance is: {}", config.to, pretty(balances::free_balance(api, &to_id, None).await?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_keyring::AccountKeyring;

    #[test]
    fn dev_uris_resolve_to_well_known_accounts() {
        let alice: AccountId32 = pair_from_uri("//Alice").unwrap().public().into();
        assert_eq!(alice, AccountKeyring::Alice.to_account_id());
        let bob: AccountId32 = pair_from_uri("//Bob").unwrap().public().into();
        assert_eq!(bob, AccountKeyring::Bob.to_account_id());
    }

    #[test]
    fn early_end_names_the_subscription_and_cause() {
        let line = ended_line("//Alice", Some(anyhow!("failed to query account").context("stream")));
        assert_eq!(line, "//Alice subscription ended early: stream: failed to query account");
        assert_eq!(ended_line("event", None), "event subscription ended early");
    }

    #[test]
    fn malformed_uri_is_rejected() {
        assert!(pair_from_uri("not a valid mnemonic").is_err());
    }
}
