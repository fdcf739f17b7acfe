//! Outbound calls to third-party services.

pub mod email;
