pub const WEB_SOCKET: &str = "wss://bifrost-rpc.liebi.com/ws";
pub const DEV_WEB_SOCKET: &str = "ws://localhost:9944";
pub const CONFIG_PATH: &str = "./data/config.json";

/// Bifrost network address format.
pub const SS58_PREFIX: u16 = 6;
/// Upper bound on accounts per delegator migration call.
pub const DELEGATOR_BATCH_SIZE: usize = 50;

pub const STAKING_PALLET: &str = "ParachainStaking";
pub const CANDIDATE_POOL: &str = "CandidatePool";
pub const TOP_DELEGATIONS: &str = "TopDelegations";
pub const MIGRATE_COLLATORS_CALL: &str = "hotfix_migrate_collators_from_reserve_to_locks";
pub const MIGRATE_DELEGATORS_CALL: &str = "hotfix_migrate_delegators_from_reserve_to_locks";

pub const ALICE: &str = "//Alice";
pub const BOB: &str = "//Bob";
pub const DEV_TRANSFER_AMOUNT: u128 = 1_000_000_000_000;
pub const DEV_WATCH_SECS: u64 = 15;
pub const TOKEN_DECIMALS: u8 = 12;
pub const TOKEN_SYMBOL: &str = "Unit";
