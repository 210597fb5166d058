//! Structures de données du service de stock
//!
//! Toutes les structures sont sérialisables en JSON (champs en camelCase) pour
//! être transmises telles quelles à la couche applicative.

use glasssoap::{Fragment, SoapRecord};
use serde::{Deserialize, Serialize};

/// Ligne de prix d'une pièce de vitrage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// Code stock interne du fournisseur
    pub mag_code: String,
    /// Code ARGIC de la pièce
    pub argic_code: String,
    pub description: String,
    /// Libellé de tarif (ex: "Trade", "Retail")
    pub price_info: String,
    /// Prix, jamais négatif
    pub price: f64,
    /// Quantité, jamais négative
    pub qty: i64,
    pub make: String,
}

impl SoapRecord for PriceRecord {
    const TAG: &'static str = "PriceRecord";

    fn from_fragment(fragment: &Fragment) -> Self {
        Self {
            mag_code: fragment.string("MagCode"),
            argic_code: fragment.string("ArgicCode"),
            description: fragment.string("Description"),
            price_info: fragment.string("PriceInfo"),
            price: fragment.number("Price"),
            qty: fragment.number("Qty"),
            make: fragment.string("Make"),
        }
    }
}

/// Dépôt du fournisseur
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depot {
    pub depot_code: String,
    pub depot_name: String,
}

impl Depot {
    /// Crée un dépôt
    pub fn new(depot_code: impl Into<String>, depot_name: impl Into<String>) -> Self {
        Self {
            depot_code: depot_code.into(),
            depot_name: depot_name.into(),
        }
    }
}

impl SoapRecord for Depot {
    const TAG: &'static str = "Depot";

    fn from_fragment(fragment: &Fragment) -> Self {
        Self {
            depot_code: fragment.string("DepotCode"),
            depot_name: fragment.string("DepotName"),
        }
    }
}

/// Stock d'une pièce dans une agence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub branch: String,
    pub mag_code: String,
    pub argic_code: String,
    pub qty: i64,
    pub price: f64,
}

impl SoapRecord for StockItem {
    const TAG: &'static str = "StockItem";

    fn from_fragment(fragment: &Fragment) -> Self {
        Self {
            branch: fragment.string("Branch"),
            mag_code: fragment.string("MagCode"),
            argic_code: fragment.string("ArgicCode"),
            qty: fragment.number("Qty"),
            price: fragment.number("Price"),
        }
    }
}

/// Réponse de `CheckAvailability`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub is_available: bool,
    pub qty: i64,
}

impl Availability {
    pub(crate) fn from_fragment(fragment: &Fragment) -> Self {
        Self {
            is_available: fragment.flag("IsAvailable"),
            qty: fragment.number("AvailableQty"),
        }
    }
}

/// Résultat de disponibilité pour un dépôt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityOutcome {
    pub argic_code: String,
    pub qty: i64,
    pub is_available: bool,
    pub depot: Option<Depot>,
    /// Message d'erreur si l'appel pour ce dépôt a échoué
    pub error: Option<String>,
}

/// Disponibilité agrégée sur plusieurs dépôts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedAvailability {
    pub argic_code: String,
    /// Dépôts ayant la pièce, dans l'ordre renvoyé par `GetDepots`
    pub depots: Vec<AvailabilityOutcome>,
    /// Somme des quantités des dépôts disponibles
    pub total_qty: i64,
    /// Dépôts dont l'appel a échoué (exclus du total)
    pub failures: Vec<AvailabilityOutcome>,
}

/// Véhicule recherché par `GetStockList`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDescriptor {
    pub make: String,
    pub model: String,
    pub model_type: String,
    pub year: String,
}

impl VehicleDescriptor {
    /// Crée un descripteur de véhicule
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        model_type: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            model_type: model_type.into(),
            year: year.into(),
        }
    }
}

/// Réponse de `GetStockList` : les lignes de prix et le véhicule demandé
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockList {
    pub vehicle: VehicleDescriptor,
    pub records: Vec<PriceRecord>,
}

/// Véhicule correspondant à une immatriculation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgicVehicleMatch {
    pub argic_code: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

/// Réponse de `GetArgicFromVrn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum VrnLookup {
    Found(ArgicVehicleMatch),
    NotFound,
}

impl VrnLookup {
    pub(crate) fn from_fragment(fragment: &Fragment) -> Self {
        match fragment.optional("ArgicCode") {
            Some(argic_code) => Self::Found(ArgicVehicleMatch {
                argic_code,
                make: fragment.optional("Make"),
                model: fragment.optional("Model"),
                year: fragment.optional("Year"),
            }),
            None => Self::NotFound,
        }
    }

    /// Correspondance trouvée, si elle existe
    pub fn found(&self) -> Option<&ArgicVehicleMatch> {
        match self {
            Self::Found(vehicle) => Some(vehicle),
            Self::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasssoap::extract_records;

    const THREE_RECORDS: &str = r#"<StockSearchByArgicResult>
  <PriceRecord>
    <MagCode>MAG001</MagCode><ArgicCode>2448AGNMV1B</ArgicCode>
    <Description>FORD FOCUS WINDSCREEN</Description><PriceInfo>Trade</PriceInfo>
    <Price>129.95</Price><Qty>4</Qty><Make>FORD</Make>
  </PriceRecord>
  <PriceRecord>
    <MagCode>MAG002</MagCode><ArgicCode>2448AGNMV1C</ArgicCode>
    <Description>FORD FOCUS WINDSCREEN HEATED</Description><PriceInfo>Retail</PriceInfo>
    <Price>210</Price><Qty>0</Qty><Make>FORD</Make>
  </PriceRecord>
  <PriceRecord>
    <MagCode>MAG003</MagCode><ArgicCode>2448AGSMV</ArgicCode>
    <Description>REAR SCREEN &amp; SEAL</Description><PriceInfo>Trade</PriceInfo>
    <Price>abc</Price><Qty>-2</Qty><Make>FORD</Make>
  </PriceRecord>
</StockSearchByArgicResult>"#;

    #[test]
    fn test_price_records_field_for_field() {
        let records: Vec<PriceRecord> = extract_records(THREE_RECORDS).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(
            records[0],
            PriceRecord {
                mag_code: "MAG001".to_string(),
                argic_code: "2448AGNMV1B".to_string(),
                description: "FORD FOCUS WINDSCREEN".to_string(),
                price_info: "Trade".to_string(),
                price: 129.95,
                qty: 4,
                make: "FORD".to_string(),
            }
        );
        assert_eq!(records[1].price, 210.0);
        assert_eq!(records[1].qty, 0);
        assert_eq!(records[2].description, "REAR SCREEN & SEAL");
        // Valeurs illisibles ou négatives ramenées à 0
        assert_eq!(records[2].price, 0.0);
        assert_eq!(records[2].qty, 0);
    }

    #[test]
    fn test_price_records_idempotent() {
        let first: Vec<PriceRecord> = extract_records(THREE_RECORDS).unwrap();
        let second: Vec<PriceRecord> = extract_records(THREE_RECORDS).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_depots_and_stock_items() {
        let xml = "<Depots><Depot><DepotCode>BIR</DepotCode><DepotName>Birmingham</DepotName></Depot>\
                   <Depot><DepotCode>LDS</DepotCode></Depot></Depots>";
        let depots: Vec<Depot> = extract_records(xml).unwrap();
        assert_eq!(
            depots,
            vec![Depot::new("BIR", "Birmingham"), Depot::new("LDS", "")]
        );

        let xml = "<StockItem><Branch>BIR</Branch><MagCode>M1</MagCode>\
                   <ArgicCode>A1</ArgicCode><Qty>3</Qty><Price>45.5</Price></StockItem>";
        let items: Vec<StockItem> = extract_records(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].branch, "BIR");
        assert_eq!(items[0].qty, 3);
        assert_eq!(items[0].price, 45.5);
    }

    #[test]
    fn test_json_shape() {
        let outcome = AvailabilityOutcome {
            argic_code: "2448AGNMV1B".to_string(),
            qty: 5,
            is_available: true,
            depot: Some(Depot::new("BIR", "Birmingham")),
            error: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["argicCode"], "2448AGNMV1B");
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["depot"]["depotCode"], "BIR");

        let lookup = VrnLookup::NotFound;
        assert_eq!(
            serde_json::to_value(&lookup).unwrap(),
            serde_json::json!({ "result": "notFound" })
        );
    }

    #[test]
    fn test_vrn_lookup_from_fragment() {
        let fragment = Fragment::parse(
            "<ArgicCode>2448AGNMV1B</ArgicCode><Make>FORD</Make><Model>FOCUS</Model><Year></Year>",
        )
        .unwrap();
        let lookup = VrnLookup::from_fragment(&fragment);
        let vehicle = lookup.found().unwrap();
        assert_eq!(vehicle.argic_code, "2448AGNMV1B");
        assert_eq!(vehicle.make.as_deref(), Some("FORD"));
        assert_eq!(vehicle.year, None);

        let empty = Fragment::parse("<ArgicCode></ArgicCode>").unwrap();
        assert_eq!(VrnLookup::from_fragment(&empty), VrnLookup::NotFound);
    }
}
