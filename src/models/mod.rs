pub mod candidate;
pub mod engagement;
pub mod history;
pub mod job;
pub mod milestone;
pub mod workflow;
