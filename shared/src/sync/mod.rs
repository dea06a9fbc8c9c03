//! Cross-app "current space" synchronisation.
//!
//! Every app on a device shares one [`SpaceStore`] slot and one named topic
//! on a [`SpaceBus`]. A [`SpaceSync`] per app migrates its legacy slot,
//! publishes local switches and applies everyone else's.

pub mod bus;
pub mod clock;
pub mod hook;
pub mod store;

pub use self::bus::{ChannelHandle, SpaceBus};
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::hook::{MigrationOutcome, SpaceCallback, SpaceSync, SyncOptions, Verdict};
pub use self::store::{SpaceStore, StorageEvent};
