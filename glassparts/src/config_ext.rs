//! Extension pour intégrer la configuration du service de stock dans glassconfig
//!
//! Ce module fournit le trait `GlassPartsConfigExt`, qui ajoute à
//! `glassconfig::Config` les accès aux identifiants et aux paramètres du
//! client, ainsi que la résolution des identifiants (Credential Provider).

use crate::retry::RetryPolicy;
use anyhow::{anyhow, Result};
use glassconfig::Config;
use glasssoap::Credentials;
use serde_yaml::Value;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Variable d'environnement du login (prioritaire sur la configuration)
pub const ENV_LOGIN: &str = "GLASSPARTS_LOGIN";

/// Variable d'environnement du mot de passe
pub const ENV_PASSWORD: &str = "GLASSPARTS_PASSWORD";

/// Variable d'environnement de l'identifiant utilisateur numérique
pub const ENV_USER_ID: &str = "GLASSPARTS_USER_ID";

/// Login utilisé quand rien n'est configuré
pub const DEFAULT_LOGIN: &str = "";

/// Mot de passe utilisé quand rien n'est configuré
pub const DEFAULT_PASSWORD: &str = "";

/// Identifiant utilisateur utilisé quand rien n'est configuré
pub const DEFAULT_USER_ID: i64 = 0;

const ACCOUNT_PATH: [&str; 2] = ["accounts", "stock_service"];

/// Trait d'extension pour gérer la configuration du service de stock
///
/// # Exemple
///
/// ```rust,ignore
/// use glassconfig::get_config;
/// use glassparts::GlassPartsConfigExt;
///
/// let config = get_config();
/// let credentials = config.get_stock_credentials();
/// println!("Stock service account: {}", credentials);
/// ```
pub trait GlassPartsConfigExt {
    /// Login configuré, `None` si absent ou vide
    fn get_stock_login(&self) -> Option<String>;

    /// Définit le login du service
    fn set_stock_login(&self, login: &str) -> Result<()>;

    /// Mot de passe configuré, `None` si absent ou vide
    fn get_stock_password(&self) -> Option<String>;

    /// Définit le mot de passe du service
    fn set_stock_password(&self, password: &str) -> Result<()>;

    /// Identifiant utilisateur configuré
    ///
    /// # Errors
    ///
    /// Retourne une erreur si la valeur configurée n'est pas un entier
    fn get_stock_user_id(&self) -> Result<Option<i64>>;

    /// Définit l'identifiant utilisateur
    fn set_stock_user_id(&self, user_id: i64) -> Result<()>;

    /// Identifiants résolus : variables d'environnement, puis configuration,
    /// puis valeurs par défaut
    fn get_stock_credentials(&self) -> Credentials;

    /// Délai d'un appel SOAP
    fn get_gateway_timeout(&self) -> Duration;

    /// Politique de nouvelles tentatives configurée
    fn get_retry_policy(&self) -> RetryPolicy;
}

impl GlassPartsConfigExt for Config {
    fn get_stock_login(&self) -> Option<String> {
        self.get_string(&[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "login"])
    }

    fn set_stock_login(&self, login: &str) -> Result<()> {
        self.set_value(
            &[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "login"],
            Value::String(login.to_string()),
        )
    }

    fn get_stock_password(&self) -> Option<String> {
        self.get_string(&[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "password"])
    }

    fn set_stock_password(&self, password: &str) -> Result<()> {
        self.set_value(
            &[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "password"],
            Value::String(password.to_string()),
        )
    }

    fn get_stock_user_id(&self) -> Result<Option<i64>> {
        match self.get_string(&[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "user_id"]) {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| anyhow!("Invalid stock service user_id: {raw:?}")),
            None => Ok(None),
        }
    }

    fn set_stock_user_id(&self, user_id: i64) -> Result<()> {
        self.set_value(
            &[ACCOUNT_PATH[0], ACCOUNT_PATH[1], "user_id"],
            Value::Number(user_id.into()),
        )
    }

    fn get_stock_credentials(&self) -> Credentials {
        resolve_credentials_with(self, |name| env::var(name).ok())
    }

    fn get_gateway_timeout(&self) -> Duration {
        let secs = self
            .get_request_timeout_secs()
            .unwrap_or(crate::transport::DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    fn get_retry_policy(&self) -> RetryPolicy {
        let attempts = self.get_max_attempts().unwrap_or(1);
        let base_ms = self
            .get_retry_base_delay_ms()
            .unwrap_or(crate::retry::DEFAULT_RETRY_BASE_DELAY_MS);
        RetryPolicy::exponential(
            u32::try_from(attempts).unwrap_or(u32::MAX),
            Duration::from_millis(base_ms),
        )
    }
}

/// Résout les identifiants avec une source de variables d'environnement donnée
///
/// Ordre de priorité, champ par champ : `lookup` (variables `GLASSPARTS_*`),
/// configuration, constantes `DEFAULT_*`. Un identifiant utilisateur non
/// numérique est ignoré avec un avertissement.
pub fn resolve_credentials_with<F>(config: &Config, lookup: F) -> Credentials
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let login = from_env(ENV_LOGIN)
        .or_else(|| config.get_stock_login())
        .unwrap_or_else(|| DEFAULT_LOGIN.to_string());

    let password = from_env(ENV_PASSWORD)
        .or_else(|| config.get_stock_password())
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    let env_user_id = from_env(ENV_USER_ID).and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(variable = ENV_USER_ID, value = %raw, "Ignoring non-numeric user id");
            None
        }
    });

    let user_id = env_user_id
        .or_else(|| match config.get_stock_user_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .unwrap_or(DEFAULT_USER_ID);

    Credentials::new(login, password, user_id)
}
