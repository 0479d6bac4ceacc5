//! Store specializations, one per piece variant.

mod command;
mod event;
mod filter;
mod finalizer;
mod guard;
mod task;

pub use command::CommandStore;
pub use event::EventStore;
pub use filter::{FilterFault, FilterReport, FilterStore};
pub use finalizer::{FinalizerFault, FinalizerStore};
pub use guard::{GuardFault, GuardReport, GuardStore};
pub use task::TaskStore;
