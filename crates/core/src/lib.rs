//! ducktunnel-core – Gemeinsame Typen und Fehlertypen
//!
//! Bausteine, die Relay und Client-Sitzung gemeinsam nutzen.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{DucktunnelError, FehlerKategorie, Result};
pub use types::{ConnectionId, RoomId};
