pub mod format;
pub mod metrics;
pub mod processes;
pub mod response;
