//! Service layer
//!
//! Services contain the runner's business logic: executing a workflow run
//! and collecting its log.
//!
//! All services are trait-based to enable testing and dependency injection.

mod execution;
mod log_buffer;

// Re-export traits
pub use execution::ExecutionService;
pub use log_buffer::LogBufferService;

// Re-export implementations
pub use execution::PipelineRunner;
pub use log_buffer::InMemoryLogBuffer;
