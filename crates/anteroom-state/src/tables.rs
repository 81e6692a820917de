//! redb table definitions for the anteroom store.
//!
//! Both tables use `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). The control table holds only the two singleton records.

use redb::TableDefinition;

/// Allow-list entries keyed by admission token.
pub const ALLOW_LIST: TableDefinition<&str, &[u8]> = TableDefinition::new("allow_list");

/// Singleton control records keyed by [`BASELINE_KEY`] and [`TUNE_KEY`].
pub const CONTROL: TableDefinition<&str, &[u8]> = TableDefinition::new("control");

/// Control key for the latency baseline captured on the prober's first run.
pub const BASELINE_KEY: &str = "baseline";

/// Control key for the rate controller state.
pub const TUNE_KEY: &str = "tune";
