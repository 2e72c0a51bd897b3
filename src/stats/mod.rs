//! Session Aggregator: read-only rollups over an in-memory session collection.
//!
//! Fixed-domain maps (per-game totals) are zero-filled over the [`GameRegistry`];
//! metadata-derived maps only hold keys that occur in the data.
//!
//! [`GameRegistry`]: crate::models::GameRegistry

mod daily;
mod summary;

pub use daily::{group_by_date_and_game, minutes_for_game_on, DailyTotals};
pub use summary::{summarize, SessionStats};
