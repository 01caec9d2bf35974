//! TLS fuer den Relay (rustls)
//!
//! Zertifikatskette und privater Schluessel werden als PEM-Dateien geladen.
//! Ist `[netzwerk.tls]` konfiguriert, bedient der Relay `wss://` statt `ws://`.

use anyhow::{Context, Result};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use ducktunnel_signaling::auf_shutdown_warten;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::TlsEinstellungen;

/// Wartezeit fuer laufende Verbindungen beim Herunterfahren
const SHUTDOWN_FRIST: Duration = Duration::from_secs(5);

/// Installiert den ring-Provider als Standard (mehrfacher Aufruf ist harmlos)
pub fn crypto_provider_installieren() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Laedt Zertifikat und Schluessel und baut die rustls-Serverkonfiguration
pub fn tls_konfiguration_laden(einstellungen: &TlsEinstellungen) -> Result<Arc<rustls::ServerConfig>> {
    crypto_provider_installieren();

    let zertifikat_pem = std::fs::read(&einstellungen.zertifikat).with_context(|| {
        format!("Zertifikat '{}' nicht lesbar", einstellungen.zertifikat)
    })?;
    let schluessel_pem = std::fs::read(&einstellungen.schluessel).with_context(|| {
        format!("Schluessel '{}' nicht lesbar", einstellungen.schluessel)
    })?;

    let kette = zertifikate_parsen(&zertifikat_pem)?;
    let schluessel = schluessel_parsen(&schluessel_pem)?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(kette, schluessel)
        .context("Zertifikat und Schluessel passen nicht zusammen")?;
    // WebSocket-Upgrades laufen ueber HTTP/1.1
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn zertifikate_parsen(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem);
    let kette = certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .context("Zertifikat-Parsing fehlgeschlagen")?;
    if kette.is_empty() {
        anyhow::bail!("Kein Zertifikat in der PEM-Datei gefunden");
    }
    Ok(kette)
}

fn schluessel_parsen(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem);
    private_key(&mut cursor)
        .context("Schluessel-Parsing fehlgeschlagen")?
        .context("Kein privater Schluessel gefunden")
}

/// Bedient den Relay-Router per TLS bis `shutdown_rx` auf `true` wechselt
pub async fn relay_tls_bedienen(
    listener: TcpListener,
    router: Router,
    tls: Arc<rustls::ServerConfig>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let lokale_addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;

    let handle = axum_server::Handle::new();
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            auf_shutdown_warten(shutdown_rx).await;
            handle.graceful_shutdown(Some(SHUTDOWN_FRIST));
        });
    }

    tracing::info!(adresse = %lokale_addr, "Signaling-Relay gestartet (TLS)");
    axum_server::from_tcp_rustls(std_listener, RustlsConfig::from_config(tls))
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("TLS-Relay abgebrochen")?;

    tracing::info!("Signaling-Relay gestoppt (TLS)");
    Ok(())
}
