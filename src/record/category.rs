use serde::{Deserialize, Serialize};
use std::fmt;

/// Press-release category on the source site
///
/// Serialized with its display name, which is the compatibility contract
/// for downstream importers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Cases formally filed in court
    #[serde(rename = "Charge Sheet")]
    ChargeSheet,

    /// Red-handed arrests
    #[serde(rename = "Sting Operation")]
    StingOperation,

    /// Supreme Court appeals
    #[serde(rename = "Appeal")]
    Appeal,

    /// Miscellaneous updates
    #[serde(rename = "Others")]
    Others,
}

/// Coarse case type, one-to-one with [`Category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    CourtFiling,
    Arrest,
    Appeal,
    Other,
}

impl Category {
    /// Every category the source publishes
    pub const ALL: [Category; 4] = [
        Self::ChargeSheet,
        Self::StingOperation,
        Self::Appeal,
        Self::Others,
    ];

    /// Categories crawled when the configuration does not name any
    pub const DEFAULT: [Category; 3] = [Self::ChargeSheet, Self::StingOperation, Self::Appeal];

    /// Short key used in configuration, URLs and synthetic ids
    pub fn key(&self) -> &'static str {
        match self {
            Self::ChargeSheet => "charge",
            Self::StingOperation => "sting",
            Self::Appeal => "appeal",
            Self::Others => "others",
        }
    }

    /// Parses a configuration key (`charge`, `sting`, `appeal`, `others`)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "charge" => Some(Self::ChargeSheet),
            "sting" => Some(Self::StingOperation),
            "appeal" => Some(Self::Appeal),
            "others" => Some(Self::Others),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChargeSheet => "Charge Sheet",
            Self::StingOperation => "Sting Operation",
            Self::Appeal => "Appeal",
            Self::Others => "Others",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.display_name() == name)
    }

    pub fn category_type(&self) -> CategoryType {
        match self {
            Self::ChargeSheet => CategoryType::CourtFiling,
            Self::StingOperation => CategoryType::Arrest,
            Self::Appeal => CategoryType::Appeal,
            Self::Others => CategoryType::Other,
        }
    }

    /// Path of the category listing, relative to the site root
    pub fn listing_path(&self) -> String {
        format!("/pressreleaseCategory/{}", self.key())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourtFiling => "court_filing",
            Self::Arrest => "arrest",
            Self::Appeal => "appeal",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "court_filing" => Some(Self::CourtFiling),
            "arrest" => Some(Self::Arrest),
            "appeal" => Some(Self::Appeal),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}
