pub mod actions;
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod filter;
pub mod highlight;
pub mod models;
pub mod paginate;
pub mod pattern;
pub mod persistence;
pub mod reducer;
pub mod state;
pub mod timestamp;

pub use actions::*;
pub use models::*;
pub use reducer::*;
pub use state::*;

pub use cache::CacheStore;
pub use config::Config;
pub use filter::TimeWindow;
pub use persistence::ViewPreferences;
