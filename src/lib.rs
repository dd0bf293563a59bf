// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # gitlab-gather
//!
//! Concurrent, cursor-driven fetcher for page-based listing endpoints such
//! as GitLab's `GET /projects` or `GET /groups/:id/events`.
//!
//! ## Features
//!
//! - **Cursor Discovery**: page 1 is fetched first and its `X-Total-Pages`
//!   header decides how many more pages to request
//! - **Bounded Concurrency**: remaining pages go to a fixed worker pool
//! - **Streaming Results**: pages are delivered as they arrive, never buffered
//! - **Error Shapes**: errors embedded per page, or on a separate stream
//! - **Pluggable Decoding**: serde JSON by default, or any callback
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gitlab_gather::decode::JsonDecoder;
//! use gitlab_gather::gather::{collect_dual, GatherConfig, Gatherer};
//! use gitlab_gather::http::{HttpClient, HttpClientConfig};
//! use gitlab_gather::query::Query;
//!
//! #[tokio::main]
//! async fn main() -> gitlab_gather::Result<()> {
//!     let client = HttpClient::with_config(
//!         HttpClientConfig::builder()
//!             .base_url("https://gitlab.com/api/v4")
//!             .private_token("glpat-...")
//!             .build(),
//!     )?;
//!
//!     let gatherer = Gatherer::new(client, JsonDecoder::<Vec<serde_json::Value>>::new())
//!         .with_config(GatherConfig::default().total_pages_limit(50));
//!
//!     let (calls, errors) = gatherer.gather_all_dual(vec![Query::page_query("projects", 1)]);
//!     let (pages, failures) = collect_dual(calls, errors).await;
//!     println!("{} pages, {} failures", pages.len(), failures.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Gatherer facade                        │
//! │   gather(seeds) → Calls     gather_dual(seeds) → (Ok, Err)   │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬────────────┬─────┴──────┬────────────┬───────────┐
//! │   Query   │ Pagination │    HTTP    │   Decode   │  Gather   │
//! ├───────────┼────────────┼────────────┼────────────┼───────────┤
//! │ Path      │ X-Page     │ GET        │ JSON       │ Head      │
//! │ Params    │ X-Total-   │ Retry      │ Callback   │ Tail pool │
//! │ Page copy │   Pages    │ Rate Limit │            │ Fan-in    │
//! └───────────┴────────────┴────────────┴────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Page descriptors
pub mod query;

/// Pagination cursor parsing
pub mod pagination;

/// Response decoders
pub mod decode;

/// HTTP client and page fetcher
pub mod http;

/// Concurrent gather pipeline
pub mod gather;

/// Configuration files
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use gather::{Call, CallNoError, GatherConfig, Gatherer, QueryError};
pub use query::Query;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
