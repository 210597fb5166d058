//! Transport HTTP des enveloppes SOAP
//!
//! Un appel = un POST. Le transport ne regarde pas le contenu SOAP : tout
//! statut 2xx est un succès. Les nouvelles tentatives sont gérées plus haut,
//! par le client.

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use glasssoap::soap_action;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, warn};

/// Délai par défaut d'un appel, en secondes
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Type de contenu des requêtes SOAP 1.1
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Message d'erreur d'un appel dont le délai a expiré
pub const TIMEOUT_MESSAGE: &str = "timed out";

/// Longueur maximale (en caractères) des corps de réponse dans les logs
pub const LOG_BODY_LIMIT: usize = 500;

/// Résultat brut d'un appel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResult {
    /// Vrai si le serveur a répondu avec un statut 2xx
    pub success: bool,
    /// Code HTTP, absent si aucune réponse n'est arrivée
    pub status_code: Option<u16>,
    /// Corps de la réponse (vide si aucune réponse)
    pub raw_body: String,
    /// Description de l'échec
    pub error: Option<String>,
    /// Vrai si le délai a expiré
    pub timed_out: bool,
}

impl TransportResult {
    /// Réponse 2xx
    pub fn ok(status_code: u16, raw_body: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            raw_body: raw_body.into(),
            error: None,
            timed_out: false,
        }
    }

    /// Réponse reçue avec un statut hors 2xx
    pub fn http_status(status_code: u16, raw_body: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            raw_body: raw_body.into(),
            error: Some(format!("HTTP status {status_code}")),
            timed_out: false,
        }
    }

    /// Aucune réponse (connexion refusée, DNS...)
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Délai dépassé
    pub fn timeout() -> Self {
        Self {
            error: Some(TIMEOUT_MESSAGE.to_string()),
            timed_out: true,
            ..Self::default()
        }
    }

    /// Corps de la réponse, ou l'erreur de transport correspondante
    ///
    /// Pour un statut hors 2xx, le `<faultstring>` éventuel du corps est
    /// ajouté au message.
    pub fn into_body(self, operation: &str) -> Result<String> {
        if self.success {
            return Ok(self.raw_body);
        }

        if self.timed_out {
            return Err(GatewayError::Timeout {
                operation: operation.to_string(),
            });
        }

        let mut message = self
            .error
            .unwrap_or_else(|| "request failed".to_string());
        if let Ok(Some(fault)) = glasssoap::extract_scalar(&self.raw_body, "faultstring") {
            message = format!("{message}: {fault}");
        }

        Err(GatewayError::Transport {
            status: self.status_code,
            message,
        })
    }
}

/// Envoi d'une enveloppe au service
///
/// Implémenté par [`HttpTransport`] ; les tests fournissent leurs propres
/// implémentations.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Envoie l'enveloppe de l'opération et rend le résultat brut
    async fn send(&self, operation: &str, namespace: &str, envelope: String) -> TransportResult;
}

/// Transport reqwest vers le point d'entrée `.asmx`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// URL du service
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Délai d'un appel
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post(&self, action: String, envelope: String) -> TransportResult {
        let response = match self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", action)
            .body(envelope)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return TransportResult::timeout(),
            Err(e) => return TransportResult::failed(error_chain(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return TransportResult::timeout(),
            Err(e) => return TransportResult::failed(error_chain(&e)),
        };

        if status.is_success() {
            TransportResult::ok(status.as_u16(), body)
        } else {
            TransportResult::http_status(status.as_u16(), body)
        }
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    async fn send(&self, operation: &str, namespace: &str, envelope: String) -> TransportResult {
        let action = soap_action(namespace, operation);
        debug!(operation, url = %self.url, action = %action, "Sending SOAP request");

        let result = match tokio::time::timeout(self.timeout, self.post(action, envelope)).await {
            Ok(result) => result,
            Err(_) => TransportResult::timeout(),
        };

        if result.success {
            debug!(
                operation,
                status = result.status_code,
                body = %truncate_for_log(&result.raw_body),
                "SOAP response received"
            );
        } else if result.timed_out {
            warn!(operation, timeout = ?self.timeout, "SOAP request timed out");
        } else {
            warn!(
                operation,
                status = result.status_code,
                error = result.error.as_deref().unwrap_or_default(),
                body = %truncate_for_log(&result.raw_body),
                "SOAP request failed"
            );
        }

        result
    }
}

/// Tronque un corps de réponse pour les logs
pub fn truncate_for_log(body: &str) -> String {
    match body.char_indices().nth(LOG_BODY_LIMIT) {
        Some((end, _)) => format!("{}…", &body[..end]),
        None => body.to_string(),
    }
}

/// Message d'une erreur et de ses causes
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
