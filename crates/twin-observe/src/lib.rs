//! Tracing setup for the digital twin service.

pub mod tracing_setup;
