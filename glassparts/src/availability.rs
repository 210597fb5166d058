//! Agrégation de la disponibilité d'une pièce sur plusieurs dépôts
//!
//! Sans filtre, la liste des dépôts est obtenue par `GetDepots` puis chaque
//! dépôt est interrogé par `CheckAvailability`, en parallèle, dans la limite
//! de `max_concurrency` appels simultanés. L'échec d'un dépôt n'annule pas
//! les autres : il est reporté dans [`AggregatedAvailability::failures`].

use crate::client::{required, required_qty, GlassPartsClient};
use crate::error::{GatewayError, Result};
use crate::models::{AggregatedAvailability, Availability, AvailabilityOutcome, Depot};
use crate::transport::SoapTransport;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

impl<T: SoapTransport> GlassPartsClient<T> {
    /// Disponibilité agrégée d'une pièce
    ///
    /// - `depot_filter` : un seul dépôt interrogé, sans appel à `GetDepots`
    /// - sinon tous les dépôts de `GetDepots` (dont l'échec fait échouer l'agrégat)
    ///
    /// Les dépôts disponibles sont rendus dans l'ordre de `GetDepots` et
    /// `total_qty` est la somme de leurs quantités, plafonnée à `i64::MAX`.
    /// Un dépôt indisponible n'apparaît nulle part.
    pub async fn aggregate_availability(
        &self,
        argic_code: &str,
        qty: u32,
        depot_filter: Option<&str>,
    ) -> Result<AggregatedAvailability> {
        let argic_code = required("ARGIC code", argic_code)?;
        required_qty(qty)?;

        let depots = match depot_filter {
            Some(code) => vec![Depot::new(required("depot", code)?, "")],
            None => self.get_depots().await?,
        };

        debug!(
            argic = argic_code,
            depots = depots.len(),
            max_concurrency = self.max_concurrency,
            "Checking availability"
        );

        let semaphore = Semaphore::new(self.max_concurrency.max(1));
        let semaphore = &semaphore;
        let checks = depots.iter().map(|depot| async move {
            let _permit = semaphore.acquire().await.map_err(|_| GatewayError::Transport {
                status: None,
                message: "availability semaphore closed".to_string(),
            })?;
            self.check_availability(argic_code, qty, &depot.depot_code)
                .await
        });
        let results = join_all(checks).await;

        let mut aggregate = AggregatedAvailability {
            argic_code: argic_code.to_string(),
            ..Default::default()
        };

        for (depot, result) in depots.into_iter().zip(results) {
            match result {
                Ok(Availability {
                    is_available: true,
                    qty: available,
                }) => {
                    aggregate.total_qty = aggregate.total_qty.saturating_add(available);
                    aggregate.depots.push(AvailabilityOutcome {
                        argic_code: argic_code.to_string(),
                        qty: available,
                        is_available: true,
                        depot: Some(depot),
                        error: None,
                    });
                }
                Ok(_) => {
                    debug!(depot = %depot.depot_code, "Part not available");
                }
                Err(e) => {
                    warn!(depot = %depot.depot_code, "Availability check failed: {}", e);
                    aggregate.failures.push(AvailabilityOutcome {
                        argic_code: argic_code.to_string(),
                        qty: 0,
                        is_available: false,
                        depot: Some(depot),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(
            argic = argic_code,
            available = aggregate.depots.len(),
            failed = aggregate.failures.len(),
            total_qty = aggregate.total_qty,
            "Availability aggregated"
        );
        Ok(aggregate)
    }
}
