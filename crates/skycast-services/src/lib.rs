//! Application services: persistence, notifications, auto-refresh and the
//! dashboard session that ties them to the weather crate.

pub mod dashboard;
pub mod favorites;
pub mod kv_store;
pub mod notification;
pub mod preferences;
pub mod refresh;

pub use dashboard::{Dashboard, LocationPermission};
pub use favorites::{Favorites, FAVORITES_KEY};
pub use kv_store::{KeyValueStore, MemoryKvStore, SqliteKvStore, Storage, StoreError, StoreResult};
pub use notification::{Notification, NotificationKind};
pub use preferences::{Preferences, DARK_MODE_KEY};
pub use refresh::{format_countdown, AutoRefresh, Countdown, CountdownView, RefreshTrigger};
