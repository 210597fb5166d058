//! Lecture tolérante des champs numériques et booléens
//!
//! Politique documentée : une quantité ou un prix illisible, négatif ou non
//! fini vaut la valeur par défaut (0). Aucune erreur n'est levée. Un champ
//! entier écrit en décimal sans partie fractionnaire (`5.0`) est accepté.

use std::str::FromStr;
use tracing::trace;

/// Types numériques acceptés par [`parse_numeric_or_default`]
pub trait LenientNumeric: FromStr + Default + Copy {
    /// Vrai si la valeur lue est acceptable (finie et non négative)
    fn is_acceptable(&self) -> bool;

    /// Conversion d'une valeur décimale entière (`5.0`), si le type l'admet
    fn from_integral(_value: f64) -> Option<Self> {
        None
    }
}

macro_rules! impl_lenient_integer {
    ($($t:ty),*) => {
        $(
            impl LenientNumeric for $t {
                #[allow(unused_comparisons)]
                fn is_acceptable(&self) -> bool {
                    *self >= 0
                }

                fn from_integral(value: f64) -> Option<Self> {
                    let in_range = value >= 0.0 && value <= <$t>::MAX as f64;
                    (value.is_finite() && value.fract() == 0.0 && in_range)
                        .then(|| value as $t)
                }
            }
        )*
    };
}

impl_lenient_integer!(i32, i64, u32, u64);

impl LenientNumeric for f64 {
    fn is_acceptable(&self) -> bool {
        self.is_finite() && *self >= 0.0
    }
}

/// Lit un nombre, ou renvoie 0 si la valeur est illisible, négative ou non finie
///
/// Pour un type entier, une écriture décimale sans partie fractionnaire
/// (`5.0`, `12.000`) est lue comme l'entier correspondant. `5.5` ou une valeur
/// hors de la plage du type vaut 0.
///
/// ```
/// use glasssoap::parse_numeric_or_default;
///
/// assert_eq!(parse_numeric_or_default::<f64>(" 129.95 "), 129.95);
/// assert_eq!(parse_numeric_or_default::<f64>("abc"), 0.0);
/// assert_eq!(parse_numeric_or_default::<i64>("-3"), 0);
/// assert_eq!(parse_numeric_or_default::<i64>("5.0"), 5);
/// ```
pub fn parse_numeric_or_default<T: LenientNumeric>(raw: &str) -> T {
    let trimmed = raw.trim();
    let parsed = trimmed.parse::<T>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(T::from_integral)
    });
    match parsed {
        Some(value) if value.is_acceptable() => value,
        _ => {
            if !trimmed.is_empty() {
                trace!(value = trimmed, "Unusable numeric value, defaulting to 0");
            }
            T::default()
        }
    }
}

/// Lit un booléen : `true`, `1`, `yes` (sans casse) valent vrai, tout le reste faux
pub fn parse_bool_or_default(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.eq_ignore_ascii_case("true")
        || trimmed == "1"
        || trimmed.eq_ignore_ascii_case("yes")
}
