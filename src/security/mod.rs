//! Security support: audit event sink and background maintenance.

mod events;
mod maintenance;

pub use events::{SecurityEventSink, SECURITY_TARGET};
pub use maintenance::MaintenanceScheduler;
