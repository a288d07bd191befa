pub mod auth;
pub mod cors;
pub mod policy;
pub mod rate_limit;
