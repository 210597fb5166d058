//! Gestion des erreurs pour le client de stock

use glasssoap::{EnvelopeError, ExtractError};
use thiserror::Error;

/// Type Result personnalisé pour glassparts
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Erreurs possibles lors d'un appel au service de stock
///
/// Les échecs de transport ([`GatewayError::Transport`], [`GatewayError::Timeout`])
/// et les échecs applicatifs ([`GatewayError::SoapFault`]) sont distincts.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Échec réseau ou statut HTTP hors 2xx
    #[error("Transport error{}: {message}", http_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Délai de la requête dépassé
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// Le service a répondu avec un statut autre que `Success`
    #[error("{operation} failed: {message}")]
    SoapFault { operation: String, message: String },

    /// Paramètre refusé avant tout envoi
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Impossible de construire l'enveloppe
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Erreur interne de l'extracteur
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Erreur du client HTTP (construction)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl GatewayError {
    /// Crée une erreur applicative SOAP
    pub fn soap_fault(operation: &str, message: impl Into<String>) -> Self {
        Self::SoapFault {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Crée une erreur de paramètre
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Vrai pour les échecs de transport, délai dépassé compris
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Vrai si le délai de la requête a été dépassé
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Vrai si le service a refusé l'opération
    pub fn is_soap_fault(&self) -> bool {
        matches!(self, Self::SoapFault { .. })
    }

    /// Code HTTP reçu, si une réponse est arrivée
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Vrai si un nouvel essai a un sens
    ///
    /// Seuls les échecs réseau, les délais dépassés et les statuts 429/5xx
    /// sont concernés. Une erreur applicative n'est jamais rejouée.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = GatewayError::Timeout {
            operation: "GetDepots".to_string(),
        };
        assert!(timeout.is_transport());
        assert!(timeout.is_timeout());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.to_string(), "GetDepots timed out");

        let fault = GatewayError::soap_fault("GetArgicFromVrn", "ARGIC code not found");
        assert!(fault.is_soap_fault());
        assert!(!fault.is_transport());
        assert!(!fault.is_retryable());
        assert_eq!(
            fault.to_string(),
            "GetArgicFromVrn failed: ARGIC code not found"
        );
    }

    #[test]
    fn test_transport_retry_rules() {
        let refused = GatewayError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(refused.is_retryable());
        assert_eq!(refused.status_code(), None);
        assert_eq!(refused.to_string(), "Transport error: connection refused");

        let server = GatewayError::Transport {
            status: Some(503),
            message: "HTTP status 503".to_string(),
        };
        assert!(server.is_retryable());
        assert_eq!(server.status_code(), Some(503));
        assert_eq!(server.to_string(), "Transport error (HTTP 503): HTTP status 503");

        let not_found = GatewayError::Transport {
            status: Some(404),
            message: "HTTP status 404".to_string(),
        };
        assert!(!not_found.is_retryable());
        assert!(!GatewayError::invalid_input("empty make").is_retryable());
    }
}
