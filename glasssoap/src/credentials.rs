//! Identifiants du service de stock
//!
//! Les trois secrets (login, mot de passe, identifiant numérique) sont
//! injectés dans le `SecureHeader` des enveloppes. Ils ne sont jamais
//! affichés en clair : `Debug` et `Display` utilisent la forme masquée.

use std::fmt;

/// Nombre de caractères laissés visibles de chaque côté d'un secret masqué
pub const MASK_VISIBLE_CHARS: usize = 2;

/// Identifiants du service SOAP
///
/// Valeur immuable, construite une fois au démarrage puis passée
/// explicitement au constructeur d'enveloppes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
    user_id: i64,
}

impl Credentials {
    /// Crée un jeu d'identifiants
    pub fn new(login: impl Into<String>, password: impl Into<String>, user_id: i64) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            user_id,
        }
    }

    /// Login du compte
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Mot de passe du compte
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Identifiant numérique du compte
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Forme masquée, utilisable dans les logs
    pub fn masked(&self) -> String {
        format!(
            "login={} password={} user_id={}",
            mask_secret(&self.login),
            mask_secret(&self.password),
            mask_secret(&self.user_id.to_string())
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &mask_secret(&self.login))
            .field("password", &mask_secret(&self.password))
            .field("user_id", &mask_secret(&self.user_id.to_string()))
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Masque un secret en ne gardant que les premiers et derniers caractères
///
/// Un secret trop court pour garder quelque chose de visible est entièrement
/// masqué. La longueur du masque suit celle du secret.
///
/// ```
/// use glasssoap::mask_secret;
///
/// assert_eq!(mask_secret("technician"), "te******an");
/// assert_eq!(mask_secret("abcd"), "****");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();

    if len <= MASK_VISIBLE_CHARS * 2 {
        return "*".repeat(len);
    }

    let head: String = chars[..MASK_VISIBLE_CHARS].iter().collect();
    let tail: String = chars[len - MASK_VISIBLE_CHARS..].iter().collect();
    format!("{}{}{}", head, "*".repeat(len - MASK_VISIBLE_CHARS * 2), tail)
}
