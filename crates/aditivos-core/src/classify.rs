//! Legal classification of contracts under Lei 14.133/2021.
//!
//! A contract's declared type and object text decide which statutory ceiling
//! applies to the sum of its value-increasing amendments. Categories are
//! checked in a fixed priority order and the first match wins, so a contract
//! mentioning both "obra" and "reforma" is a renovation (50%), not a work (25%).
//!
//! Matching is a case-insensitive substring test against both fields. Plural
//! forms whose spelling changes (`instalação` → `instalações`) are listed
//! explicitly; regular plurals are covered by the singular stem.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Statute the ceilings come from.
pub const LEGAL_BASIS: &str = "Lei 14.133/2021";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    RenovationEquipment,
    WorksServicesPurchases,
    MixedCompany,
    Default,
}

/// Categories in match priority order.
const RULES: &[(Category, &[&str])] = &[
    (
        Category::RenovationEquipment,
        &[
            "reforma",
            "equipamento",
            "edifício",
            "instalação",
            "instalações",
            "manutenção",
            "manutenções",
        ],
    ),
    (
        Category::WorksServicesPurchases,
        &[
            "obra",
            "construção",
            "construções",
            "ampliação",
            "ampliações",
            "restauração",
            "restaurações",
            "demolição",
            "demolições",
            "serviço",
            "compra",
            "fornecimento",
        ],
    ),
    (Category::MixedCompany, &["sociedade", "mista"]),
];

impl Category {
    pub const ALL: [Category; 4] = [
        Self::RenovationEquipment,
        Self::WorksServicesPurchases,
        Self::MixedCompany,
        Self::Default,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::RenovationEquipment => "RENOVATION_EQUIPMENT",
            Self::WorksServicesPurchases => "WORKS_SERVICES_PURCHASES",
            Self::MixedCompany => "MIXED_COMPANY",
            Self::Default => "DEFAULT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RenovationEquipment => "Reforma de Edifício ou Equipamento",
            Self::WorksServicesPurchases => "Obras, Serviços ou Compras",
            Self::MixedCompany => "Sociedade Mista",
            Self::Default => "Demais Contratos",
        }
    }

    /// Maximum cumulative amendment percentage allowed by statute.
    pub fn ceiling_percent(self) -> Decimal {
        match self {
            Self::RenovationEquipment => Decimal::from(50),
            Self::WorksServicesPurchases | Self::MixedCompany | Self::Default => {
                Decimal::from(25)
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.code() == wanted)
            .ok_or_else(|| ValidationError::single("category", format!("unknown category {s:?}")))
    }
}

/// Result of classifying a contract. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub ceiling_percent: Decimal,
    pub label: &'static str,
}

impl From<Category> for Classification {
    fn from(category: Category) -> Self {
        Self {
            category,
            ceiling_percent: category.ceiling_percent(),
            label: category.label(),
        }
    }
}

/// Classify a contract from its declared type and object description.
///
/// Total and deterministic: empty inputs fall through to [`Category::Default`].
pub fn classify(type_label: &str, object_text: &str) -> Classification {
    let type_label = type_label.to_lowercase();
    let object_text = object_text.to_lowercase();

    let category = RULES
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|k| type_label.contains(k) || object_text.contains(k))
        })
        .map(|(category, _)| *category)
        .unwrap_or(Category::Default);

    Classification::from(category)
}
