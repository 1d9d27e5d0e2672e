// Moderation workflow: gate a new comment through classification, with
// re-check, override and cancel paths for flagged text.

pub mod session;
pub mod state;

pub use session::{ModerationSession, SessionOutcome};
pub use state::{ModerationEvent, ModerationState, Publication, Route, FLAG_WARNING};
