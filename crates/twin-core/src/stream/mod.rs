//! Incremental delivery of model output.
//!
//! `pump` moves fragments from the backend onto a bounded channel owned by a
//! background task; `responder` turns them into wire events.

pub mod pump;
pub mod responder;
