pub mod dates;
pub mod game;
pub mod metadata;
pub mod session;

pub use dates::{format_date, normalize_date, parse_timestamp};
pub use game::{GameId, GameKind, GameRegistry};
pub use metadata::{AimType, KovaaksMetadata, MatchType, SessionMetadata, ValorantMetadata};
pub use session::{duration_minutes_between, new_session_id, SessionRecord};
