use std::fmt;

use anyhow::Context;
use futures::StreamExt;
use subxt::{ext::sp_core::H256, OnlineClient, PolkadotConfig};

use crate::subscription::Subscription;

/// A runtime event from a finalized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub block_hash: H256,
    pub index: u32,
    pub pallet: String,
    pub variant: String,
    /// SCALE encoded event fields.
    pub data: Vec<u8>,
}

impl fmt::Display for ChainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} #{} in {:?} data 0x{}",
            self.pallet,
            self.variant,
            self.index,
            self.block_hash,
            hex::encode(&self.data)
        )
    }
}

/// Matches events by pallet and event name; unset parts match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub pallet: Option<String>,
    pub variant: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, pallet: &str, variant: &str) -> bool {
        self.pallet.as_deref().map_or(true, |p| p == pallet)
            && self.variant.as_deref().map_or(true, |v| v == variant)
    }
}

pub async fn subscribe_events(
    api: &OnlineClient<PolkadotConfig>,
    filter: EventFilter,
) -> anyhow::Result<Subscription<ChainEvent>> {
    let mut blocks = api.events().subscribe_finalized().await?;
    Ok(Subscription::spawn(move |tx| async move {
        while let Some(events) = blocks.next().await {
            let events = events.context("event subscription lost the block stream")?;
            let block_hash = events.block_hash();
            for event in events.iter() {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(%err, ?block_hash, "skipping undecodable event");
                        continue;
                    }
                };
                if !filter.matches(event.pallet_name(), event.variant_name()) {
                    continue;
                }
                let event = ChainEvent {
                    block_hash,
                    index: event.index(),
                    pallet: event.pallet_name().to_string(),
                    variant: event.variant_name().to_string(),
                    data: event.field_bytes().to_vec(),
                };
                if tx.send(event).is_err() {
                    return Ok(());
                }
            }
        }
        Ok::<_, anyhow::Error>(())
    }))
}
