//! Tile streaming engine: asset cache, load queue, fetch workers, view
//! transform and the per-frame driver that ties them together.

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod priority;
pub mod queue;
pub mod request;
pub mod residency;
pub mod session;
pub mod view;

pub use cache::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use fetch::*;
pub use priority::*;
pub use queue::*;
pub use request::*;
pub use residency::*;
pub use session::*;
pub use view::*;
