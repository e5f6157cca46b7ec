//! Filesystem adapters.

pub mod persona;
