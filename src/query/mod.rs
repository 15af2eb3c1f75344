//! Query cache: keys, network gate, and the executor that applies the retry policy.

mod client;
pub mod keys;
mod network;

pub use client::{MUTATION_ERROR_CODE, QUERY_ERROR_CODE, QueryClient};
pub use keys::QueryKey;
pub use network::NetworkStatus;
