pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod registry;
pub mod scheduler;
