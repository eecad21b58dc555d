pub mod backend;
pub mod contracts;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::*;
pub use sync::*;
pub use worker::SyncCommand;
