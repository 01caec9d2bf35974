//! Relay-Endpunkt: `<endpoint>?room=<roomId>`

use ducktunnel_core::RoomId;
use url::Url;

/// Name des Query-Parameters fuer die Raum-Kennung
pub const ROOM_PARAM: &str = "room";

/// Baut die WebSocket-URL fuer einen Raum
///
/// Bereits vorhandene Query-Parameter des Endpunkts bleiben erhalten; die
/// Raum-Kennung wird URL-kodiert angehaengt.
pub fn signaling_url(endpoint: &str, raum: &RoomId) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(endpoint)?;
    url.query_pairs_mut().append_pair(ROOM_PARAM, raum.as_str());
    Ok(url)
}

/// Baut den teilbaren Raum-Link `<origin>/<roomId>`
pub fn share_url(origin: &str, raum: &RoomId) -> String {
    format!("{}/{}", origin.trim_end_matches('/'), raum.as_str())
}
