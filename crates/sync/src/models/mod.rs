//! Domain models for the sync engine.

pub mod mapping;
pub mod order;
pub mod product;
pub mod queue;

pub use mapping::{MappingEntry, SyncOutcome, TrackedFields};
pub use order::{ChannelOrder, ChannelOrderLine, NewOrderLine};
pub use product::{GradeDeclaration, LocalProduct};
pub use queue::{ExportQueueEntry, QueueOperation, QueueStatus};
