//! Tests fuer den Verbindungs-Zustandsautomaten (mit Test-Doubles)

mod common;

use common::{Fehlerplan, Umgebung};
use ducktunnel_core::{DucktunnelError, FehlerKategorie};
use ducktunnel_protocol::Signal;
use ducktunnel_session::{CallState, SessionConfig};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn join_fuehrt_nach_connected() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();

    let s = u.handle.snapshot();
    assert_eq!(s.state, CallState::Connected);
    assert_eq!(s.room.as_ref().map(|r| r.as_str()), Some("duck-1"));
    assert!(s.resources.media && s.resources.peer && s.resources.signaling);
    assert!(s.error.is_none());

    let log = u.log.eintraege();
    assert_eq!(log[0], "capture.acquire");
    assert_eq!(log[1], "signaling.connect:ws://127.0.0.1:8000/ws?room=duck-1");
    assert_eq!(log[2], "peer.create");
}

#[tokio::test]
async fn leere_raum_id_wird_abgelehnt() {
    let u = Umgebung::neu();
    let fehler = u.handle.join("   ").await.unwrap_err();

    assert!(matches!(fehler, DucktunnelError::UngueltigeEingabe(_)));
    assert_eq!(fehler.nutzer_meldung(), "Please enter a room ID");
    assert_eq!(u.handle.snapshot().state, CallState::Disconnected);
    assert!(u.log.eintraege().is_empty(), "kein Collaborator angefasst");
}

#[tokio::test]
async fn join_nur_aus_disconnected() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();

    let fehler = u.handle.join("duck-2").await.unwrap_err();
    assert_eq!(fehler.kategorie(), FehlerKategorie::Bedienung);
    let s = u.handle.snapshot();
    assert_eq!(s.state, CallState::Connected);
    assert_eq!(s.room.unwrap().as_str(), "duck-1");
}

#[tokio::test]
async fn in_call_erst_nach_remote_track() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();

    // Offer kommt an, Antwort geht raus, aber noch kein Anruf
    u.relay_sendet(r#"{"type":"offer","offer":{"type":"offer","sdp":"x"}}"#);
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::Connected);
    assert!(u.log.enthaelt("peer.remote:offer"));
    assert!(u.log.enthaelt("peer.local:answer"));

    let gesendet = u.gesendet();
    assert_eq!(gesendet.len(), 1);
    assert!(matches!(
        serde_json::from_str::<Signal>(&gesendet[0]).unwrap(),
        Signal::Answer { .. }
    ));

    u.remote_track();
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::InCall);
}

#[tokio::test]
async fn start_call_sendet_offer_und_verarbeitet_answer() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    u.handle.start_call().await.unwrap();

    assert!(u.log.enthaelt("peer.local:offer"));
    let gesendet = u.gesendet();
    match serde_json::from_str::<Signal>(&gesendet[0]).unwrap() {
        Signal::Offer { offer } => assert_eq!(offer["type"], "offer"),
        anderes => panic!("Offer erwartet, erhalten: {anderes:?}"),
    }

    u.relay_sendet(r#"{"type":"answer","answer":{"type":"answer","sdp":"y"}}"#);
    let s = u.handle.settle().await.unwrap();
    assert!(u.log.enthaelt("peer.remote:answer"));
    assert_eq!(s.state, CallState::Connected, "Answer allein startet keinen Anruf");
}

#[tokio::test]
async fn start_call_ausserhalb_von_connected() {
    let u = Umgebung::neu();
    let fehler = u.handle.start_call().await.unwrap_err();
    assert_eq!(
        fehler,
        DucktunnelError::UngueltigerZustand {
            befehl: "start call",
            zustand: "disconnected"
        }
    );
}

#[tokio::test]
async fn kandidaten_vor_und_nach_description() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();

    u.relay_sendet(r#"{"type":"candidate","candidate":{"candidate":"früh"}}"#);
    u.relay_sendet(r#"{"type":"offer","offer":{"type":"offer","sdp":"x"}}"#);
    u.relay_sendet(r#"{"type":"candidate","candidate":{"candidate":"spaet"}}"#);
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Connected);
    assert!(s.error.is_none());
    // Der fruehe Kandidat wartet auf die Remote-Description
    let offer = u.log.position("peer.remote:offer").unwrap();
    let frueh = u.log.position(r#"peer.candidate:{"candidate":"früh"}"#).unwrap();
    let spaet = u.log.position(r#"peer.candidate:{"candidate":"spaet"}"#).unwrap();
    assert!(offer < frueh && frueh < spaet);
    assert!(u.log.enthaelt("peer.local:answer"));
}

#[tokio::test]
async fn kandidaten_vor_der_answer_werden_gepuffert() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    u.handle.start_call().await.unwrap();

    u.relay_sendet(r#"{"type":"candidate","candidate":{"candidate":"eins"}}"#);
    u.relay_sendet(r#"{"type":"candidate","candidate":{"candidate":"zwei"}}"#);
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::Connected);
    assert!(!u.log.enthaelt(r#"peer.candidate:{"candidate":"eins"}"#));

    u.relay_sendet(r#"{"type":"answer","answer":{"type":"answer","sdp":"y"}}"#);
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::Connected);
    assert!(s.error.is_none());

    let answer = u.log.position("peer.remote:answer").unwrap();
    let eins = u.log.position(r#"peer.candidate:{"candidate":"eins"}"#).unwrap();
    let zwei = u.log.position(r#"peer.candidate:{"candidate":"zwei"}"#).unwrap();
    assert!(answer < eins && eins < zwei);
    assert_eq!(u.log.anzahl(r#"peer.candidate:{"candidate":"eins"}"#), 1);
}

#[tokio::test]
async fn lokale_kandidaten_werden_gesendet() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    u.lokaler_kandidat(json!({"candidate": "candidate:1 1 udp 2122260223 10.0.0.2 5000 typ host"}));
    u.handle.settle().await.unwrap();

    let gesendet = u.gesendet();
    assert_eq!(gesendet.len(), 1);
    assert!(matches!(
        serde_json::from_str::<Signal>(&gesendet[0]).unwrap(),
        Signal::Candidate { .. }
    ));
}

#[tokio::test]
async fn peer_left_gibt_alles_frei() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;

    u.relay_sendet(r#"{"type":"peer-left"}"#);
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Disconnected);
    assert!(s.resources.keine());
    let fehler = s.error.unwrap();
    assert_eq!(fehler.kategorie, FehlerKategorie::PeerGegangen);
    assert_eq!(fehler.meldung, "Your peer left the room");

    // Reihenfolge: Socket, Peer, Aufnahme
    let socket = u.log.position("signaling.close").unwrap();
    let peer = u.log.position("peer.close").unwrap();
    let media = u.log.position("media.stop").unwrap();
    assert!(socket < peer && peer < media);
}

#[tokio::test]
async fn room_full_ergibt_kapazitaetsfehler() {
    let u = Umgebung::neu();
    u.handle.join("voll").await.unwrap();
    u.relay_sendet(r#"{"type":"room-full"}"#);
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Disconnected);
    assert_eq!(s.error.unwrap().kategorie, FehlerKategorie::Kapazitaet);
    assert!(u.log.enthaelt("media.stop"));
}

#[tokio::test]
async fn socket_ende_im_anruf() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;
    u.relay_schliesst();
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Disconnected);
    let fehler = s.error.unwrap();
    assert_eq!(fehler.kategorie, FehlerKategorie::Transport);
    assert_eq!(fehler.meldung, "Connection lost");
}

#[tokio::test]
async fn leave_ist_idempotent() {
    let u = Umgebung::neu();
    u.handle.leave_room().await.unwrap();
    assert!(u.log.eintraege().is_empty());

    u.im_anruf("duck-1").await;
    u.handle.leave_room().await.unwrap();
    u.handle.leave_room().await.unwrap();

    let s = u.handle.snapshot();
    assert_eq!(s.state, CallState::Disconnected);
    assert!(s.resources.keine());
    assert!(s.error.is_none());
    assert!(s.room.is_none());
    assert_eq!(u.log.anzahl("signaling.close"), 1);
    assert_eq!(u.log.anzahl("peer.close"), 1);
    assert_eq!(u.log.anzahl("media.stop"), 1);
}

#[tokio::test]
async fn leave_loescht_fehler_und_status() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;
    u.relay_sendet(r#"{"type":"peer-left"}"#);
    assert!(u.handle.settle().await.unwrap().error.is_some());

    u.handle.leave_room().await.unwrap();
    let s = u.handle.snapshot();
    assert!(s.error.is_none());
    assert!(!s.muted);
    assert!(!s.link_kopiert);
}

#[tokio::test]
async fn toggle_mute_zweimal() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;
    let gesendet_vorher = u.gesendet().len();

    assert!(u.handle.toggle_mute().await.unwrap());
    assert!(u.handle.snapshot().muted);
    assert!(!u.handle.toggle_mute().await.unwrap());

    let s = u.handle.snapshot();
    assert!(!s.muted);
    assert_eq!(s.state, CallState::InCall);
    assert_eq!(u.log.anzahl("media.enabled=false"), 1);
    assert_eq!(u.log.anzahl("media.enabled=true"), 1);
    assert_eq!(u.gesendet().len(), gesendet_vorher, "Mute sendet nichts");
}

#[tokio::test]
async fn toggle_mute_nur_im_anruf() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    let fehler = u.handle.toggle_mute().await.unwrap_err();
    assert!(!fehler.erzwingt_trennung());
    assert_eq!(u.handle.snapshot().state, CallState::Connected);
}

#[tokio::test]
async fn bedienfehler_im_anruf_trennen_nicht() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;

    let fehler = u.handle.start_call().await.unwrap_err();
    assert_eq!(fehler.kategorie(), FehlerKategorie::Bedienung);
    let fehler = u.handle.join("duck-2").await.unwrap_err();
    assert_eq!(fehler.kategorie(), FehlerKategorie::Bedienung);

    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::InCall);
    assert!(s.error.is_none());
    assert!(s.resources.media && s.resources.peer && s.resources.signaling);
    assert!(!u.log.enthaelt("peer.close"));
}

#[tokio::test]
async fn mikrofon_verweigert() {
    let u = Umgebung::mit_plan(Fehlerplan {
        capture_verweigert: true,
        ..Fehlerplan::default()
    });
    let fehler = u.handle.join("duck-1").await.unwrap_err();

    assert_eq!(fehler.kategorie(), FehlerKategorie::Berechtigung);
    let s = u.handle.snapshot();
    assert_eq!(s.state, CallState::Disconnected);
    assert_eq!(
        s.error.unwrap().meldung,
        "Cannot access microphone. Please allow access and try again."
    );
    assert!(!u.log.eintraege().iter().any(|e| e.starts_with("signaling.connect")));
}

#[tokio::test]
async fn socket_oeffnen_fehlgeschlagen_gibt_aufnahme_frei() {
    let u = Umgebung::mit_plan(Fehlerplan {
        connect_fehlschlag: true,
        ..Fehlerplan::default()
    });
    let fehler = u.handle.join("duck-1").await.unwrap_err();

    assert_eq!(fehler.kategorie(), FehlerKategorie::Transport);
    assert_eq!(fehler.nutzer_meldung(), "Failed to connect to server");
    assert!(u.log.enthaelt("media.stop"));
    assert!(!u.log.enthaelt("peer.create"));
    assert!(u.handle.snapshot().resources.keine());

    // Neuer Versuch beginnt sauber in disconnected
    assert_eq!(u.handle.snapshot().state, CallState::Disconnected);
}

#[tokio::test]
async fn aushandlungsfehler_trennt() {
    let u = Umgebung::mit_plan(Fehlerplan {
        remote_description_fehlschlag: true,
        ..Fehlerplan::default()
    });
    u.handle.join("duck-1").await.unwrap();
    u.relay_sendet(r#"{"type":"offer","offer":{"type":"offer","sdp":"x"}}"#);
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Disconnected);
    let fehler = s.error.unwrap();
    assert_eq!(fehler.kategorie, FehlerKategorie::Aushandlung);
    assert_eq!(fehler.meldung, "Failed to handle offer");
}

#[tokio::test]
async fn neuverhandlung_im_anruf() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;

    u.relay_sendet(r#"{"type":"offer","offer":{"type":"offer","sdp":"neu"}}"#);
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::InCall);
    assert_eq!(u.log.anzahl("peer.create"), 1, "dieselbe Peer-Verbindung");
    assert!(u.log.enthaelt("peer.local:answer"));
}

#[tokio::test]
async fn unbekannte_nachrichten_werden_ignoriert() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    u.relay_sendet("kein json");
    u.relay_sendet(r#"{"type":"chat","text":"hallo"}"#);
    let s = u.handle.settle().await.unwrap();
    assert_eq!(s.state, CallState::Connected);
    assert!(s.error.is_none());
}

#[tokio::test]
async fn veraltete_ereignisse_werden_verworfen() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();
    let alter_peer = u.letzter_peer_sink();
    let altes_signaling = u.letzter_signaling_sink();
    u.handle.leave_room().await.unwrap();

    u.handle.join("duck-1").await.unwrap();
    alter_peer.emit(ducktunnel_session::SessionEvent::RemoteTrack);
    altes_signaling.emit(ducktunnel_session::SessionEvent::SignalingClosed);
    let s = u.handle.settle().await.unwrap();

    assert_eq!(s.state, CallState::Connected);
    assert!(s.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn share_room_setzt_bestaetigung_zurueck() {
    let u = Umgebung::neu();
    u.im_anruf("duck-1").await;

    let link = u.handle.share_room().await.unwrap();
    assert_eq!(link, "https://ducktunnel.com/duck-1");
    assert!(u.handle.snapshot().link_kopiert);

    let s = u.handle.wait_for(|s| !s.link_kopiert).await.unwrap();
    assert_eq!(s.state, CallState::InCall, "Teilen aendert den Zustand nicht");
}

#[tokio::test(start_paused = true)]
async fn erneutes_teilen_verlaengert_bestaetigung() {
    let config = SessionConfig {
        share_ack_ms: 1000,
        ..SessionConfig::default()
    };
    let u = Umgebung::mit(config, Fehlerplan::default());
    u.im_anruf("duck-1").await;

    u.handle.share_room().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    u.handle.share_room().await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // Erster Timer ist abgelaufen, zweiter noch nicht
    assert!(u.handle.settle().await.unwrap().link_kopiert);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!u.handle.settle().await.unwrap().link_kopiert);
}

#[tokio::test]
async fn letzter_handle_beendet_sitzung() {
    let u = Umgebung::neu();
    u.handle.join("duck-1").await.unwrap();

    let zweiter = u.handle.clone();
    let log = u.log.clone();
    drop(u);
    assert!(!log.enthaelt("media.stop"), "ein Handle lebt noch");

    drop(zweiter);
    log.warten_auf("media.stop").await;
    assert_eq!(log.anzahl("signaling.close"), 1);
}
