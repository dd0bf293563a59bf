//! Gather pipeline module
//!
//! Fetches every page of one or more paginated collections concurrently.
//!
//! # Overview
//!
//! ```text
//!  seeds ──▶ HeadStage ──┬──▶ page 1 envelopes ───────────────┐
//!                        │                                     ├──▶ FanIn ──▶ caller
//!                        └──▶ derived queries ──▶ TailStage ──┘
//!                                                 (N workers)
//! ```
//!
//! - [`HeadStage`] fetches page 1 of each seed, emits it at once, reads the
//!   pagination cursor and enqueues pages `2..=N`.
//! - [`TailStage`] drains the derived queries with a fixed worker pool.
//! - [`FanIn`] merges both result streams; the merged stream closes once
//!   every seed has been processed and every worker has exited.
//! - [`Gatherer`] wires the stages together. The error-channel shape is
//!   chosen by the [`Outlet`]: errors embedded in each [`Call`]
//!   ([`Gatherer::gather`]) or segregated onto a [`QueryError`] stream
//!   ([`Gatherer::gather_dual`]).
//!
//! No ordering is guaranteed across seeds, workers or the two stages.

mod fan_in;
mod gatherer;
mod head;
mod outlet;
mod source;
mod tail;
mod types;

pub use fan_in::FanIn;
pub use gatherer::{collect_calls, collect_dual, Gatherer};
pub use head::HeadStage;
pub use outlet::{CombinedOutlet, Outlet, SegregatedOutlet};
pub use source::PageSource;
pub use tail::TailStage;
pub use types::{Call, CallNoError, GatherConfig, GatherStats, QueryError, StatsSnapshot};

#[cfg(test)]
mod tests;
