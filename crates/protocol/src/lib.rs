//! ducktunnel-protocol – Signalisierungs-Protokoll
//!
//! Nachrichtentypen zwischen Client und Relay sowie der Aufbau der
//! Relay-URL.

pub mod endpoint;
pub mod signal;

pub use endpoint::{share_url, signaling_url, ROOM_PARAM};
pub use signal::{Incoming, RelayNotice, Signal, SignalKind};
