//! Batched execution under token arbitration

mod allocator;
mod batch;
mod executor;

pub use allocator::{AllocationGuard, ResourceAllocator};
pub use batch::{Batch, BatchMode, BatchPlanner};
pub use executor::{BatchExecutor, ExecutionResult, ExecutionStatus};
