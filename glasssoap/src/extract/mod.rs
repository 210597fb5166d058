//! Extraction des réponses SOAP
//!
//! Ce n'est pas un parseur XML complet : les réponses du service sont lues
//! par éléments, en s'appuyant sur le fait qu'il n'imbrique jamais un élément
//! dans un élément de même nom et qu'il ne met pas de données dans les
//! attributs.
//!
//! Règles communes à tous les extracteurs :
//! - les préfixes de namespace sont ignorés (`<soap:Status>` == `<Status>`)
//! - un élément absent donne la valeur par défaut, jamais une erreur
//! - les enregistrements répétés sont rendus dans l'ordre du document, doublons compris
//! - les entités (`&amp;`, `&#233;`...) et les sections CDATA sont décodées
//!
//! Chaque forme d'enregistrement implémente [`SoapRecord`].

mod numeric;

pub use numeric::{LenientNumeric, parse_bool_or_default, parse_numeric_or_default};

use lazy_static::lazy_static;
use quick_xml::escape::unescape;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Préfixe de namespace optionnel devant un nom d'élément
const PREFIX: &str = r"(?:[A-Za-z_][\w.-]*:)?";

/// Attributs d'une balise ouvrante (les `/` hors guillemets excluent les balises auto-fermantes)
const ATTRIBUTES: &str = r#"(?:\s(?:[^>"'/]|"[^"]*"|'[^']*')*)?"#;

lazy_static! {
    /// Élément feuille : `<p:Name attr="x">texte</p:Name>`, le texte ne contient pas de balise
    static ref LEAF_ELEMENT: Result<Regex, regex::Error> = Regex::new(&format!(
        r"<{prefix}([A-Za-z_][\w.-]*){attrs}>((?:[^<]|<!\[CDATA\[.*?\]\]>)*)</{prefix}([A-Za-z_][\w.-]*)\s*>",
        prefix = PREFIX,
        attrs = ATTRIBUTES,
    ));

    /// Motifs d'éléments nommés déjà compilés, par nom de balise
    static ref ELEMENT_PATTERNS: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Erreur interne d'extraction
///
/// Une balise absente n'est jamais une erreur ; seule la compilation d'un
/// motif de recherche peut échouer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid extraction pattern for <{tag}>: {source}")]
    Pattern {
        tag: String,
        #[source]
        source: regex::Error,
    },
}

/// Forme d'enregistrement répété dans une réponse SOAP
///
/// # Example
///
/// ```
/// use glasssoap::{Fragment, SoapRecord, extract_records};
///
/// struct Colour {
///     code: String,
/// }
///
/// impl SoapRecord for Colour {
///     const TAG: &'static str = "Colour";
///
///     fn from_fragment(fragment: &Fragment) -> Self {
///         Self { code: fragment.string("Code") }
///     }
/// }
///
/// let xml = "<Colours><Colour><Code>GN</Code></Colour><Colour/></Colours>";
/// let colours: Vec<Colour> = extract_records(xml).unwrap();
/// assert_eq!(colours.len(), 1);
/// assert_eq!(colours[0].code, "GN");
/// ```
pub trait SoapRecord: Sized {
    /// Nom local de l'élément qui délimite un enregistrement
    const TAG: &'static str;

    /// Construit l'enregistrement à partir du contenu d'une occurrence
    fn from_fragment(fragment: &Fragment) -> Self;
}

/// Contenu d'une occurrence d'enregistrement, indexé par nom de champ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    fields: Vec<(String, String)>,
}

impl Fragment {
    /// Indexe les éléments feuilles d'un morceau de XML
    pub fn parse(xml: &str) -> Result<Self, ExtractError> {
        let leaf = leaf_pattern()?;
        let fields = leaf
            .captures_iter(xml)
            .filter(|caps| caps[1] == caps[3])
            .map(|caps| (caps[1].to_string(), decode_text(&caps[2])))
            .collect();
        Ok(Self { fields })
    }

    /// Texte du premier champ portant ce nom
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Texte du champ, ou chaîne vide s'il est absent
    pub fn string(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Texte non vide du champ
    pub fn optional(&self, name: &str) -> Option<String> {
        self.text(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Valeur numérique du champ, 0 si absent ou illisible
    pub fn number<T: LenientNumeric>(&self, name: &str) -> T {
        self.text(name)
            .map(parse_numeric_or_default)
            .unwrap_or_default()
    }

    /// Valeur booléenne du champ, faux si absent
    pub fn flag(&self, name: &str) -> bool {
        self.text(name).is_some_and(parse_bool_or_default)
    }

    /// Nombre de champs indexés
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Vrai si aucun champ n'a été trouvé
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Statut applicatif d'une réponse
///
/// Le service place `<Status>` et `<ErrorMessage>` à un endroit quelconque du
/// corps. Un `<soap:Fault>` est aussi relevé via son `<faultstring>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapStatus {
    /// Contenu de `<Status>`, `None` s'il est absent
    pub status: Option<String>,

    /// Contenu de `<ErrorMessage>`, vide s'il est absent
    pub error_message: String,

    /// Contenu de `<faultstring>` si la réponse est un SOAP Fault
    pub fault: Option<String>,
}

/// Valeur de `<Status>` indiquant un succès
pub const STATUS_SUCCESS: &str = "Success";

impl SoapStatus {
    /// Vrai si `<Status>` vaut exactement `Success`
    pub fn is_success(&self) -> bool {
        self.fault.is_none() && self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// Vrai si la réponse ne porte aucun statut
    pub fn is_absent(&self) -> bool {
        self.status.is_none()
    }

    /// Message d'erreur à remonter à l'appelant
    pub fn failure_message(&self) -> String {
        match &self.fault {
            Some(fault) if self.error_message.is_empty() => fault.clone(),
            _ => self.error_message.clone(),
        }
    }
}

/// Extrait la paire `<Status>` / `<ErrorMessage>` (et un éventuel `<faultstring>`)
pub fn extract_status(xml: &str) -> Result<SoapStatus, ExtractError> {
    Ok(SoapStatus {
        status: extract_scalar(xml, "Status")?,
        error_message: extract_scalar(xml, "ErrorMessage")?.unwrap_or_default(),
        fault: extract_scalar(xml, "faultstring")?,
    })
}

/// Texte de la première occurrence d'un élément
pub fn extract_scalar(xml: &str, tag: &str) -> Result<Option<String>, ExtractError> {
    let pattern = element_pattern(tag)?;
    Ok(pattern
        .captures(xml)
        .map(|caps| decode_text(&caps[1])))
}

/// Textes de toutes les occurrences d'un élément, dans l'ordre du document
///
/// Sert aux tableaux `ArrayOfString` (`<string>FOCUS</string><string>FIESTA</string>`).
pub fn extract_strings(xml: &str, tag: &str) -> Result<Vec<String>, ExtractError> {
    let pattern = element_pattern(tag)?;
    Ok(pattern
        .captures_iter(xml)
        .map(|caps| decode_text(&caps[1]))
        .collect())
}

/// Extrait toutes les occurrences d'un enregistrement
///
/// Les occurrences sont prises sans chevauchement, dans l'ordre du document.
pub fn extract_records<R: SoapRecord>(xml: &str) -> Result<Vec<R>, ExtractError> {
    let pattern = element_pattern(R::TAG)?;
    pattern
        .captures_iter(xml)
        .map(|caps| Fragment::parse(&caps[1]).map(|fragment| R::from_fragment(&fragment)))
        .collect()
}

fn leaf_pattern() -> Result<&'static Regex, ExtractError> {
    LEAF_ELEMENT
        .as_ref()
        .map_err(|source| ExtractError::Pattern {
            tag: "*".to_string(),
            source: source.clone(),
        })
}

/// Motif d'un élément nommé, contenu capturé au plus court
///
/// Compilé une fois par balise puis servi depuis le cache.
fn element_pattern(tag: &str) -> Result<Regex, ExtractError> {
    let mut cache = ELEMENT_PATTERNS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(pattern) = cache.get(tag) {
        return Ok(pattern.clone());
    }

    let name = regex::escape(tag);
    let pattern = Regex::new(&format!(
        r"(?s)<{prefix}{name}{attrs}>(.*?)</{prefix}{name}\s*>",
        prefix = PREFIX,
        name = name,
        attrs = ATTRIBUTES,
    ))
    .map_err(|source| ExtractError::Pattern {
        tag: tag.to_string(),
        source,
    })?;
    cache.insert(tag.to_string(), pattern.clone());
    Ok(pattern)
}

/// Décode le texte d'un élément : CDATA, entités, espaces en bordure
fn decode_text(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return inner.to_string();
    }

    match unescape(trimmed) {
        Ok(Cow::Borrowed(text)) => text.to_string(),
        Ok(Cow::Owned(text)) => text,
        Err(_) => trimmed.to_string(),
    }
}
