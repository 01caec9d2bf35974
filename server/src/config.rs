//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Relay ohne Konfigurationsdatei
//! lauffaehig ist.

use ducktunnel_observability::logging::{log_format_gueltig, log_level_gueltig};
use ducktunnel_signaling::{RelayConfig, STANDARD_MAX_NACHRICHT_BYTES, STANDARD_PFAD};
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen (Relay-Endpunkt)
    pub netzwerk: NetzwerkEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Ducktunnel Relay".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP/WebSocket
    pub bind_adresse: String,
    /// Port des Relays
    pub port: u16,
    /// Pfad des WebSocket-Endpunkts
    pub ws_pfad: String,
    /// Erlaubte `Origin`-Header (leer = alle erlaubt)
    pub erlaubte_origins: Vec<String>,
    /// Maximale Groesse einer WebSocket-Nachricht in Bytes
    pub max_nachricht_bytes: usize,
    /// TLS direkt im Relay (`[netzwerk.tls]`); ohne Eintrag unverschluesselt
    pub tls: Option<TlsEinstellungen>,
}

/// Zertifikat und Schluessel fuer `wss://`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsEinstellungen {
    /// Pfad zur PEM-Zertifikatskette
    pub zertifikat: String,
    /// Pfad zum PEM-Schluessel
    pub schluessel: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8000,
            ws_pfad: STANDARD_PFAD.into(),
            erlaubte_origins: vec![],
            max_nachricht_bytes: STANDARD_MAX_NACHRICHT_BYTES,
            tls: None,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die TOML allein nicht ausschliesst
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if !self.netzwerk.ws_pfad.starts_with('/') {
            anyhow::bail!(
                "netzwerk.ws_pfad muss mit '/' beginnen: '{}'",
                self.netzwerk.ws_pfad
            );
        }
        if self.netzwerk.max_nachricht_bytes == 0 {
            anyhow::bail!("netzwerk.max_nachricht_bytes muss groesser als 0 sein");
        }
        if let Some(tls) = &self.netzwerk.tls {
            if tls.zertifikat.is_empty() || tls.schluessel.is_empty() {
                anyhow::bail!("netzwerk.tls braucht 'zertifikat' und 'schluessel'");
            }
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Unbekanntes Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Unbekanntes Log-Format: '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse des Relays zurueck
    pub fn relay_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Endpunkt-Konfiguration fuer den Relay
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            pfad: self.netzwerk.ws_pfad.clone(),
            erlaubte_origins: self.netzwerk.erlaubte_origins.clone(),
            max_nachricht_bytes: self.netzwerk.max_nachricht_bytes,
        }
    }
}
