pub mod hold;
pub mod orchestrator;
pub mod populate;
pub mod slow_read;
