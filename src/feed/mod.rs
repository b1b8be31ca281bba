mod state;
mod sync;

pub use state::{DetailOutcome, LoadOutcome, PageOutcome, SearchOutcome};
pub use sync::FeedSync;
