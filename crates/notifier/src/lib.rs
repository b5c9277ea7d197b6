//! SOS recording notifier.
//!
//! Reacts to finished uploads under `sos_recordings/`, picks the newest file
//! of the session and texts a download link to the user's emergency contacts.

pub mod auth;
pub mod contacts;
pub mod dispatcher;
pub mod group;
pub mod path;
pub mod signing;
pub mod sms;
pub mod storage;
pub mod users;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
