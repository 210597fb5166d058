//! # glasssoap - Enveloppes et extraction SOAP
//!
//! Cette crate regroupe la partie « protocole » du client de stock :
//!
//! - ✅ Identifiants du service avec affichage masqué ([`Credentials`])
//! - ✅ Construction d'enveloppes SOAP 1.1 avec `SecureHeader` ([`build_envelope`])
//! - ✅ Extraction tolérante des réponses ([`extract_records`], [`extract_status`]...)
//!
//! Elle ne fait aucune entrée/sortie : le transport HTTP et les opérations
//! métier sont dans `glassparts`.
//!
//! ## Example
//!
//! ```
//! use glasssoap::{Credentials, SoapOperation, build_envelope, extract_status, extract_strings};
//!
//! let credentials = Credentials::new("workshop", "secret", 42);
//! let operation = SoapOperation::new("GetModels", "http://tempuri.org").arg("Make", "FORD");
//! let envelope = build_envelope(&operation, &credentials).unwrap();
//! assert!(envelope.contains("<UserID>42</UserID>"));
//!
//! let response = "<GetModelsResult><string>FOCUS</string><string>FIESTA</string></GetModelsResult>";
//! assert_eq!(extract_strings(response, "string").unwrap(), vec!["FOCUS", "FIESTA"]);
//! assert!(extract_status(response).unwrap().is_absent());
//! ```

mod credentials;
mod envelope;
mod extract;

pub use credentials::{Credentials, MASK_VISIBLE_CHARS, mask_secret};
pub use envelope::{
    EnvelopeError, SOAP_ENVELOPE_NS, SoapOperation, XSD_NS, XSI_NS, build_envelope, soap_action,
};
pub use extract::{
    ExtractError, Fragment, LenientNumeric, STATUS_SUCCESS, SoapRecord, SoapStatus,
    extract_records, extract_scalar, extract_status, extract_strings, parse_bool_or_default,
    parse_numeric_or_default,
};
