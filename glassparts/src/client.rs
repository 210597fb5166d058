//! Client du service de stock de vitrage
//!
//! Chaque méthode publique correspond à une opération SOAP : elle valide ses
//! paramètres, construit l'enveloppe, l'envoie par le transport, vérifie le
//! statut applicatif puis extrait le résultat typé.

use crate::config_ext::{DEFAULT_LOGIN, DEFAULT_PASSWORD, DEFAULT_USER_ID, GlassPartsConfigExt};
use crate::error::{GatewayError, Result};
use crate::models::{Availability, Depot, PriceRecord, StockItem, StockList, VehicleDescriptor, VrnLookup};
use crate::retry::RetryPolicy;
use crate::transport::{DEFAULT_TIMEOUT_SECS, HttpTransport, SoapTransport};
use glassconfig::{get_config, Config};
use glasssoap::{
    build_envelope, extract_records, extract_scalar, extract_status, extract_strings, Credentials,
    Fragment, SoapOperation,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// URL par défaut du service
pub const DEFAULT_SERVICE_URL: &str = "https://stock.glassparts.invalid/pdaservice.asmx";

/// Namespace par défaut du service (namespace ASMX, avec sa barre finale)
pub const DEFAULT_NAMESPACE: &str = "http://tempuri.org/";

/// Nombre maximal d'appels simultanés de l'agrégateur
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str = "glassparts/0.1.0";

/// Vérification du `<Status>` applicatif d'une réponse
///
/// Un `<soap:Fault>` est toujours une erreur, quelle que soit la politique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusPolicy {
    /// `<Status>Success</Status>` obligatoire
    Required,
    /// Vérifié seulement si `<Status>` est présent
    IfPresent,
    /// Réponse scalaire sans statut
    Ignored,
}

/// Client du service de stock
///
/// Le client est `Clone` et partage son transport : les clones réutilisent
/// le même pool de connexions HTTP.
///
/// # Example
///
/// ```no_run
/// use glassparts::GlassPartsClient;
/// use glasssoap::Credentials;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = GlassPartsClient::builder()
///         .credentials(Credentials::new("workshop", "secret", 42))
///         .build()?;
///
///     for model in client.get_models("FORD").await? {
///         println!("{}", model);
///     }
///     Ok(())
/// }
/// ```
pub struct GlassPartsClient<T: SoapTransport = HttpTransport> {
    transport: Arc<T>,
    credentials: Credentials,
    namespace: String,
    pub(crate) max_concurrency: usize,
    retry: RetryPolicy,
}

impl<T: SoapTransport> Clone for GlassPartsClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            credentials: self.credentials.clone(),
            namespace: self.namespace.clone(),
            max_concurrency: self.max_concurrency,
            retry: self.retry,
        }
    }
}

impl<T: SoapTransport> std::fmt::Debug for GlassPartsClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlassPartsClient")
            .field("credentials", &self.credentials)
            .field("namespace", &self.namespace)
            .field("max_concurrency", &self.max_concurrency)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GlassPartsClient<HttpTransport> {
    /// Crée un builder pour configurer le client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Crée un client HTTP avec les réglages par défaut
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::builder().credentials(credentials).build()
    }

    /// Crée un client à partir de la configuration globale
    pub fn from_config() -> Result<Self> {
        Self::from_config_with(&get_config())
    }

    /// Crée un client à partir d'une configuration donnée
    ///
    /// Lit les identifiants (variables d'environnement comprises), le délai,
    /// la concurrence, les nouvelles tentatives et l'URL éventuelle du service.
    pub fn from_config_with(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .credentials(config.get_stock_credentials())
            .timeout(config.get_gateway_timeout())
            .max_concurrency(config.get_max_concurrency()?)
            .retry(config.get_retry_policy());

        if let Some(url) = config.get_service_url() {
            builder = builder.service_url(url);
        }

        builder.build()
    }
}

impl<T: SoapTransport> GlassPartsClient<T> {
    /// Crée un client sur un transport fourni
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        Self {
            transport: Arc::new(transport),
            credentials,
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::none(),
        }
    }

    /// Change le namespace du service
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Change la borne de concurrence de l'agrégateur (minimum 1)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Change la politique de nouvelles tentatives
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Identifiants utilisés pour le `SecureHeader`
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Transport sous-jacent
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Vérifie que le service répond (opération anonyme)
    pub async fn hello_world(&self) -> Result<String> {
        let operation = SoapOperation::anonymous("HelloWorld", &self.namespace);
        let body = self.call(operation, StatusPolicy::Ignored).await?;
        Ok(extract_scalar(&body, "HelloWorldResult")?.unwrap_or_default())
    }

    /// Liste des marques de véhicules
    pub async fn get_makes(&self) -> Result<Vec<String>> {
        let body = self
            .call(self.operation("GetMakes"), StatusPolicy::IfPresent)
            .await?;
        Ok(extract_strings(&body, "string")?)
    }

    /// Liste des modèles d'une marque, dans l'ordre du service
    pub async fn get_models(&self, make: &str) -> Result<Vec<String>> {
        let make = required("make", make)?;
        let operation = self.operation("GetModels").arg("Make", make);
        let body = self.call(operation, StatusPolicy::IfPresent).await?;
        Ok(extract_strings(&body, "string")?)
    }

    /// Lignes de prix pour un véhicule
    ///
    /// Seule la marque est obligatoire ; les autres critères peuvent être vides.
    pub async fn get_stock_list(
        &self,
        make: &str,
        model: &str,
        model_type: &str,
        year: &str,
    ) -> Result<StockList> {
        let vehicle = VehicleDescriptor::new(
            required("make", make)?,
            model.trim(),
            model_type.trim(),
            year.trim(),
        );

        let operation = self
            .operation("GetStockList")
            .arg("Make", &vehicle.make)
            .arg("Model", &vehicle.model)
            .arg("ModelType", &vehicle.model_type)
            .arg("Year", &vehicle.year);
        let body = self.call(operation, StatusPolicy::Required).await?;

        Ok(StockList {
            records: extract_records::<PriceRecord>(&body)?,
            vehicle,
        })
    }

    /// Disponibilité d'une quantité de pièce dans un dépôt
    pub async fn check_availability(
        &self,
        argic_code: &str,
        qty: u32,
        depot: &str,
    ) -> Result<Availability> {
        let argic_code = required("ARGIC code", argic_code)?;
        let depot = required("depot", depot)?;
        required_qty(qty)?;

        let operation = self
            .operation("CheckAvailability")
            .arg("ArgicCode", argic_code)
            .arg("Qty", qty)
            .arg("Depot", depot);
        let body = self.call(operation, StatusPolicy::Required).await?;

        Ok(Availability::from_fragment(&Fragment::parse(&body)?))
    }

    /// Liste des dépôts, dans l'ordre du service
    pub async fn get_depots(&self) -> Result<Vec<Depot>> {
        let body = self
            .call(self.operation("GetDepots"), StatusPolicy::Required)
            .await?;
        Ok(extract_records::<Depot>(&body)?)
    }

    /// Recherche de stock par code ARGIC
    ///
    /// `location` peut être vide pour une recherche sur tous les sites.
    pub async fn stock_search_by_argic(
        &self,
        argic_code: &str,
        location: &str,
    ) -> Result<Vec<PriceRecord>> {
        let argic_code = required("ARGIC code", argic_code)?;
        let operation = self
            .operation("StockSearchByArgic")
            .arg("ArgicCode", argic_code)
            .arg("Location", location.trim());
        let body = self.call(operation, StatusPolicy::Required).await?;
        Ok(extract_records::<PriceRecord>(&body)?)
    }

    /// Stock d'une pièce dans chaque agence
    pub async fn get_branch_availability(&self, argic_code: &str) -> Result<Vec<StockItem>> {
        let argic_code = required("ARGIC code", argic_code)?;
        let operation = self
            .operation("GetBranchAvailability")
            .arg("ArgicCode", argic_code);
        let body = self.call(operation, StatusPolicy::Required).await?;
        Ok(extract_records::<StockItem>(&body)?)
    }

    /// Code ARGIC du pare-brise d'un véhicule à partir de son immatriculation
    ///
    /// L'immatriculation est normalisée avant l'envoi (voir [`normalize_vrn`]).
    /// Une réponse `Success` sans code ARGIC donne [`VrnLookup::NotFound`].
    pub async fn get_argic_from_vrn(&self, vrn: &str) -> Result<VrnLookup> {
        let vrn = normalize_vrn(vrn);
        if vrn.is_empty() {
            return Err(GatewayError::invalid_input("VRN must not be empty"));
        }

        let operation = self.operation("GetArgicFromVrn").arg("Vrn", &vrn);
        let body = self.call(operation, StatusPolicy::Required).await?;
        let lookup = VrnLookup::from_fragment(&Fragment::parse(&body)?);

        if lookup.found().is_none() {
            debug!(vrn = %vrn, "No ARGIC code for registration");
        }
        Ok(lookup)
    }

    fn operation(&self, name: &str) -> SoapOperation {
        SoapOperation::new(name, &self.namespace)
    }

    /// Envoie l'opération, rejoue les échecs de transport si la politique le
    /// permet, puis vérifie le statut applicatif
    async fn call(&self, operation: SoapOperation, policy: StatusPolicy) -> Result<String> {
        let envelope = build_envelope(&operation, &self.credentials)?;
        let name = operation.name.as_str();

        let mut attempt = 1;
        let body = loop {
            let result = self
                .transport
                .send(name, &operation.namespace, envelope.clone())
                .await;

            match result.into_body(name) {
                Ok(body) => break body,
                Err(e) if e.is_retryable() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(operation = name, attempt, ?delay, "Retrying after error: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        check_status(name, &body, policy)?;
        Ok(body)
    }
}

/// Vérifie le statut applicatif d'une réponse
fn check_status(operation: &str, body: &str, policy: StatusPolicy) -> Result<()> {
    let status = extract_status(body)?;

    let accepted = status.fault.is_none()
        && match policy {
            StatusPolicy::Required => status.is_success(),
            StatusPolicy::IfPresent => status.is_absent() || status.is_success(),
            StatusPolicy::Ignored => true,
        };

    if accepted {
        return Ok(());
    }

    let message = status.failure_message();
    warn!(
        operation,
        status = status.status.as_deref().unwrap_or_default(),
        error = %message,
        "SOAP operation refused"
    );
    Err(GatewayError::soap_fault(operation, message))
}

/// Normalise une immatriculation : espaces supprimés, majuscules
///
/// ```
/// assert_eq!(glassparts::normalize_vrn(" ab12 cde "), "AB12CDE");
/// ```
pub fn normalize_vrn(vrn: &str) -> String {
    vrn.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(GatewayError::invalid_input(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

pub(crate) fn required_qty(qty: u32) -> Result<()> {
    if qty == 0 {
        Err(GatewayError::invalid_input("quantity must be at least 1"))
    } else {
        Ok(())
    }
}

/// Builder du client HTTP
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    service_url: String,
    namespace: String,
    credentials: Credentials,
    timeout: Duration,
    max_concurrency: usize,
    retry: RetryPolicy,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            credentials: Credentials::new(DEFAULT_LOGIN, DEFAULT_PASSWORD, DEFAULT_USER_ID),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::none(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Utilise un client reqwest existant (pool de connexions partagé)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// URL du point d'entrée `.asmx`
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Délai de chaque appel
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Borne de concurrence de l'agrégateur (minimum 1)
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Construit le client
    pub fn build(self) -> Result<GlassPartsClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        let transport = HttpTransport::new(client, self.service_url, self.timeout);
        Ok(GlassPartsClient::with_transport(transport, self.credentials)
            .with_namespace(self.namespace)
            .with_max_concurrency(self.max_concurrency)
            .with_retry(self.retry))
    }
}
