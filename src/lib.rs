//! # Geoblock - Country-Based Port Blocking for Linux Firewalls
//!
//! Blocks inbound TCP traffic on selected ports from IP ranges belonging to
//! selected countries, keeps that state synchronized with remote per-country
//! CIDR zone files, and removes every block it created — and nothing else —
//! on request.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                      Geoblock                          │
//! ├────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                            │
//! │    └── block, refresh, list, remove, interactive       │
//! ├────────────────────────────────────────────────────────┤
//! │  Reconciliation Engine        Teardown Engine          │
//! │    (desired state → sets+rules) (verified removal)     │
//! ├────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest)   Set Store (ipset)  Rules (iptables)│
//! │    zone files          country_XX sets    DROP on dport │
//! ├────────────────────────────────────────────────────────┤
//! │  CommandExecutor trait (mockable system commands)      │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Each managed country owns one `hash:net` ipset named `country_<CODE>`
//! and one iptables DROP rule per blocked port referencing it. Rules are
//! never duplicated, sets are never destroyed while referenced, and every
//! engine operation reports per-item results so partial success is precise.
//!
//! ## Example
//!
//! ```no_run
//! use geoblock::cmd_abstraction::RealCommandExecutor;
//! use geoblock::fetcher::ZoneFetcher;
//! use geoblock::ipset::SetStore;
//! use geoblock::reconcile::{BlockTarget, Reconciler};
//! use geoblock::rules::{RemovalPolicy, RuleInventory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let executor = RealCommandExecutor::new();
//!     let sets = SetStore::new(executor.clone());
//!     let rules = RuleInventory::new(executor, RemovalPolicy::default());
//!     let fetcher = ZoneFetcher::new(geoblock::fetcher::DEFAULT_ZONE_URL)?;
//!
//!     let reconciler = Reconciler::new(&sets, &rules, &fetcher);
//!     let targets = vec![BlockTarget {
//!         country: "cn".parse()?,
//!         ports: vec![22],
//!     }];
//!     for result in reconciler.reconcile(&targets).await {
//!         println!("{}: {:?}", result.set_name, result.outcome);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod ipset;
pub mod lock;
pub mod reconcile;
pub mod rules;
pub mod teardown;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::GeoblockError;
