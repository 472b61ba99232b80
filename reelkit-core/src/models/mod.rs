pub mod film;
pub mod id;
pub mod link;
pub mod player;
pub mod provider;
pub mod watch_progress;

pub use film::*;
pub use id::*;
pub use link::*;
pub use player::*;
pub use provider::*;
pub use provider_test::*;
pub use watch_progress::*;
