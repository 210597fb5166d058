//! Construction des enveloppes SOAP 1.1

use crate::Credentials;
use quick_xml::escape::escape;

/// Namespace de l'enveloppe SOAP 1.1
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace XML Schema instance
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace XML Schema
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Erreur de construction d'enveloppe
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Invalid XML element name: {0:?}")]
    InvalidName(String),

    #[error("Empty namespace for operation {0}")]
    EmptyNamespace(String),
}

/// Opération SOAP à envoyer
///
/// Construite pour un appel puis abandonnée après l'envoi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapOperation {
    /// Nom de l'opération (ex: "GetModels")
    pub name: String,

    /// Namespace du service
    pub namespace: String,

    /// Ajoute le `SecureHeader` avec les identifiants
    pub secure_header: bool,

    /// Arguments du corps, dans l'ordre d'émission
    pub args: Vec<(String, String)>,
}

impl SoapOperation {
    /// Crée une opération authentifiée (avec `SecureHeader`)
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            secure_header: true,
            args: Vec::new(),
        }
    }

    /// Crée une opération anonyme (sans `SecureHeader`)
    pub fn anonymous(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            secure_header: false,
            ..Self::new(name, namespace)
        }
    }

    /// Ajoute un argument au corps
    pub fn arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((name.into(), value.to_string()));
        self
    }

    /// Valeur de l'en-tête HTTP `SOAPAction`
    pub fn soap_action(&self) -> String {
        soap_action(&self.namespace, &self.name)
    }

    /// Fragment XML du corps : `<Operation xmlns="ns"><Arg>valeur</Arg></Operation>`
    pub fn body_fragment(&self) -> Result<String, EnvelopeError> {
        check_name(&self.name)?;
        if self.namespace.trim().is_empty() {
            return Err(EnvelopeError::EmptyNamespace(self.name.clone()));
        }

        let mut body = format!(
            "<{} xmlns=\"{}\">",
            self.name,
            escape(self.namespace.as_str())
        );
        for (name, value) in &self.args {
            check_name(name)?;
            push_element(&mut body, name, value);
        }
        body.push_str(&format!("</{}>", self.name));
        Ok(body)
    }
}

/// Valeur de l'en-tête `SOAPAction` : `{namespace}/{operation}`
///
/// Un `/` final du namespace n'est pas doublé.
pub fn soap_action(namespace: &str, operation: &str) -> String {
    format!("{}/{}", namespace.trim_end_matches('/'), operation)
}

/// Construit l'enveloppe SOAP complète d'une opération
///
/// Fonction pure : les mêmes entrées donnent toujours la même chaîne.
/// Les valeurs (arguments et identifiants) sont échappées.
///
/// # Arguments
///
/// * `operation` - Opération à envelopper
/// * `credentials` - Identifiants insérés dans le `SecureHeader` si l'opération le demande
///
/// # Example
///
/// ```
/// use glasssoap::{Credentials, SoapOperation, build_envelope};
///
/// let credentials = Credentials::new("workshop", "secret", 42);
/// let operation = SoapOperation::new("GetModels", "http://tempuri.org").arg("Make", "FORD");
/// let xml = build_envelope(&operation, &credentials).unwrap();
///
/// assert!(xml.contains("<SecureHeader xmlns=\"http://tempuri.org\">"));
/// assert!(xml.contains("<Make>FORD</Make>"));
/// ```
pub fn build_envelope(
    operation: &SoapOperation,
    credentials: &Credentials,
) -> Result<String, EnvelopeError> {
    let body = operation.body_fragment()?;

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    xml.push_str(&format!(
        "<soap:Envelope xmlns:xsi=\"{}\" xmlns:xsd=\"{}\" xmlns:soap=\"{}\">",
        XSI_NS, XSD_NS, SOAP_ENVELOPE_NS
    ));

    if operation.secure_header {
        xml.push_str("<soap:Header>");
        xml.push_str(&format!(
            "<SecureHeader xmlns=\"{}\">",
            escape(operation.namespace.as_str())
        ));
        push_element(&mut xml, "Login", credentials.login());
        push_element(&mut xml, "Password", credentials.password());
        push_element(&mut xml, "UserID", &credentials.user_id().to_string());
        xml.push_str("</SecureHeader>");
        xml.push_str("</soap:Header>");
    }

    xml.push_str("<soap:Body>");
    xml.push_str(&body);
    xml.push_str("</soap:Body>");
    xml.push_str("</soap:Envelope>");

    Ok(xml)
}

fn push_element(xml: &mut String, name: &str, value: &str) {
    xml.push_str(&format!("<{}>{}</{}>", name, escape(value), name));
}

/// Vérifie qu'un nom peut servir de nom d'élément XML (sans préfixe)
fn check_name(name: &str) -> Result<(), EnvelopeError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(EnvelopeError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://tempuri.org";

    fn credentials() -> Credentials {
        Credentials::new("workshop", "p&ss<word>", 1234)
    }

    #[test]
    fn test_secure_header_present() {
        let op = SoapOperation::new("GetMakes", NS);
        let xml = build_envelope(&op, &credentials()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\""));
        assert!(xml.contains("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""));
        assert!(xml.contains("xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\""));
        assert!(xml.contains("<soap:Header><SecureHeader xmlns=\"http://tempuri.org\">"));
        assert!(xml.contains("<Login>workshop</Login>"));
        assert!(xml.contains("<Password>p&amp;ss&lt;word&gt;</Password>"));
        assert!(xml.contains("<UserID>1234</UserID>"));
        assert!(xml.contains("<soap:Body><GetMakes xmlns=\"http://tempuri.org\"></GetMakes></soap:Body>"));
    }

    #[test]
    fn test_anonymous_has_no_header() {
        let op = SoapOperation::anonymous("HelloWorld", NS);
        let xml = build_envelope(&op, &credentials()).unwrap();

        assert!(!xml.contains("SecureHeader"));
        assert!(!xml.contains("soap:Header"));
        assert!(!xml.contains("workshop"));
        assert!(xml.contains("<HelloWorld xmlns=\"http://tempuri.org\"></HelloWorld>"));
    }

    #[test]
    fn test_args_are_ordered_and_escaped() {
        let op = SoapOperation::new("GetStockList", NS)
            .arg("Make", "FORD")
            .arg("Model", "FOCUS <C-MAX>")
            .arg("ModelType", "5 DR H/B & ESTATE")
            .arg("Year", 2011);
        let body = op.body_fragment().unwrap();

        assert_eq!(
            body,
            "<GetStockList xmlns=\"http://tempuri.org\"><Make>FORD</Make>\
             <Model>FOCUS &lt;C-MAX&gt;</Model>\
             <ModelType>5 DR H/B &amp; ESTATE</ModelType>\
             <Year>2011</Year></GetStockList>"
        );
    }

    #[test]
    fn test_deterministic() {
        let op = SoapOperation::new("CheckAvailability", NS)
            .arg("ArgicCode", "2448AGNMV1B")
            .arg("Qty", 2)
            .arg("Depot", "BIR");
        let first = build_envelope(&op, &credentials()).unwrap();
        let second = build_envelope(&op, &credentials()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let op = SoapOperation::new("Get Makes", NS);
        assert_eq!(
            build_envelope(&op, &credentials()),
            Err(EnvelopeError::InvalidName("Get Makes".to_string()))
        );

        let op = SoapOperation::new("GetModels", NS).arg("<Make>", "FORD");
        assert!(matches!(
            op.body_fragment(),
            Err(EnvelopeError::InvalidName(_))
        ));

        let op = SoapOperation::new("GetModels", " ");
        assert!(matches!(
            op.body_fragment(),
            Err(EnvelopeError::EmptyNamespace(_))
        ));
    }

    #[test]
    fn test_soap_action() {
        assert_eq!(soap_action(NS, "GetDepots"), "http://tempuri.org/GetDepots");
        assert_eq!(
            soap_action("http://tempuri.org/", "GetDepots"),
            "http://tempuri.org/GetDepots"
        );
        assert_eq!(
            SoapOperation::anonymous("HelloWorld", NS).soap_action(),
            "http://tempuri.org/HelloWorld"
        );
    }
}
