// Attempt lifecycle: start/resume, scoring and submission, the expiry sweep,
// and the read-only dashboard and result projections.

pub mod dashboard;
pub mod handlers;
pub mod lifecycle;
pub mod scoring;
pub mod sweep;
