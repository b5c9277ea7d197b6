//! HTTP trigger surface for the SOS notifier.
//!
//! Routes:
//! - POST / — storage finalize event (Eventarc / Cloud Run)
//! - GET  /health — liveness

pub mod routes;
pub mod state;
