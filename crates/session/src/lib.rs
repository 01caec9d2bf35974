//! ducktunnel-session – Client-Seite eines Ducktunnel-Anrufs
//!
//! Enthaelt den Verbindungs-Zustandsautomaten (`SessionHandle`), die
//! Schnittstellen zu Mikrofon und Peer-Verbindung, den WebSocket-Transport
//! zum Relay sowie zwei Anzeige-Helfer (Raumnamen, Raum-Verlauf).
//!
//! ## Architektur
//!
//! ```text
//! SessionHandle (join, start_call, toggle_mute, share_room, leave_room)
//!     |  Befehle mit oneshot-Antwort
//!     v
//! Ereignis-Queue (mpsc)  <-- EventSink <-- MediaCapture / PeerConnection / SignalingChannel
//!     |
//!     v
//! Sitzung (ein Task, Zustandsautomat)  --> watch<SessionSnapshot>
//! ```

pub mod capability;
pub mod config;
pub mod event;
pub mod recent;
pub mod room_name;
pub mod session;
pub mod state;
pub mod transport;

// Bequeme Re-Exporte
pub use capability::{
    Candidate, Description, LocalMedia, MediaCapture, PeerConnection, PeerConnectionFactory,
    SignalingChannel, SignalingConnector,
};
pub use config::{AudioConstraints, SessionConfig};
pub use event::{EventSink, SessionEvent};
pub use recent::{RecentRoom, RecentRooms, MAX_RECENT_ROOMS};
pub use room_name::generate_room_name;
pub use session::{Collaborators, SessionHandle};
pub use state::{CallState, HeldResources, SessionError, SessionSnapshot};
pub use transport::WebSocketConnector;
