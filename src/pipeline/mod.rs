//! Relay pipeline.
//!
//! - `Ledger`: which rows were already announced
//! - `Poller`: the fetch, filter, announce, commit cycle
//! - `Relay`: wiring from configuration, used by the CLI
//! - `run_test_mention`: operator check that mentions land

pub mod command;
pub mod ledger;
pub mod poll;
pub mod relay;

pub use command::{latest_recipient, run_test_mention};
pub use ledger::{Ledger, Unseen, UnseenRow};
pub use poll::{Poller, SkipReason, TickReport, TickStatus};
pub use relay::Relay;
