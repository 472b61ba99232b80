pub mod episode;
pub mod media_links;
pub mod player;
pub mod provider_test;
pub mod session;
pub mod watch_progress;

pub use episode::{next_episode, EpisodeLookup, SeasonEpisodeLookup};
pub use media_links::{LinkRequest, LinkResolution, MediaLinksResolver, ProviderLinksResolver};
pub use player::{AppPlayer, HeadlessPlayer, MediaItem, PrepareRequest};
pub use provider_test::{ProviderTestJob, TestRunOutcome};
pub use session::{PlayerSession, SessionDeps};
pub use watch_progress::{InMemoryWatchProgressRepository, WatchProgressRepository};
