use crate::error::{AtlasError, AtlasResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_ID_LEN: usize = 64;

/// Stable jurisdiction identifier, e.g. `us-ca` or `us-ca-cd12`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JurisdictionId(String);

impl JurisdictionId {
    /// Validate and wrap an identifier.
    ///
    /// Allowed characters are lowercase ASCII letters, digits, `-`, `_`, `.` and `:`.
    pub fn new(id: impl Into<String>) -> AtlasResult<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(AtlasError::Validation(format!(
                "jurisdiction id must be 1..={} characters",
                MAX_ID_LEN
            )));
        }
        let valid = id.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | ':')
        });
        if !valid {
            return Err(AtlasError::Validation(format!("invalid jurisdiction id: {}", id)));
        }
        Ok(Self(id))
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JurisdictionId {
    type Error = AtlasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JurisdictionId> for String {
    fn from(id: JurisdictionId) -> Self {
        id.0
    }
}

impl fmt::Debug for JurisdictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JurisdictionId({})", self.0)
    }
}

impl fmt::Display for JurisdictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Granularity level of a jurisdiction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// A state or province.
    State,
    /// A federal legislative district.
    FederalDistrict,
    /// A county.
    County,
    /// A city or municipality.
    City,
    /// A school board district.
    SchoolBoard,
    /// Operator-defined level; lower is coarser.
    Custom(u8),
}

impl Granularity {
    /// Nesting rank. A parent must have a strictly smaller rank than its child.
    pub fn rank(&self) -> u8 {
        match self {
            Self::State => 10,
            Self::FederalDistrict | Self::County => 20,
            Self::City => 30,
            Self::SchoolBoard => 40,
            Self::Custom(level) => *level,
        }
    }

    /// Whether `self` may be the parent of `child`.
    pub fn is_coarser_than(&self, child: &Granularity) -> bool {
        self.rank() < child.rank()
    }
}

/// Level-specific attributes of a jurisdiction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum JurisdictionKind {
    /// A state, identified by its postal code.
    State {
        /// Postal code, e.g. `CA`.
        code: String,
    },
    /// A federal district inside a state.
    FederalDistrict {
        /// Postal code of the containing state.
        state_code: String,
        /// District number.
        number: u16,
    },
    /// A county.
    County {
        /// County name.
        name: String,
        /// FIPS code, when known.
        fips: Option<String>,
    },
    /// A city.
    City {
        /// City name.
        name: String,
    },
    /// A school board district.
    SchoolBoard {
        /// Board name.
        name: String,
    },
    /// Any other unit.
    Custom {
        /// Free-form label.
        label: String,
        /// Nesting rank; lower is coarser.
        rank: u8,
    },
}

impl JurisdictionKind {
    /// Granularity of this kind.
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::State { .. } => Granularity::State,
            Self::FederalDistrict { .. } => Granularity::FederalDistrict,
            Self::County { .. } => Granularity::County,
            Self::City { .. } => Granularity::City,
            Self::SchoolBoard { .. } => Granularity::SchoolBoard,
            Self::Custom { rank, .. } => Granularity::Custom(*rank),
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> String {
        match self {
            Self::State { code } => code.clone(),
            Self::FederalDistrict { state_code, number } => format!("{}-{:02}", state_code, number),
            Self::County { name, .. } | Self::City { name } | Self::SchoolBoard { name } => {
                name.clone()
            }
            Self::Custom { label, .. } => label.clone(),
        }
    }
}

/// A defined jurisdiction and its position in the global tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    /// Stable identifier.
    pub id: JurisdictionId,
    /// Level-specific attributes.
    pub kind: JurisdictionKind,
    /// Enclosing jurisdiction, if any.
    pub parent: Option<JurisdictionId>,
    /// Leaf slot of this jurisdiction's root in the global tree.
    pub global_slot: u64,
    /// Number of commitments in the district tree.
    pub leaf_count: u64,
    /// Definition time.
    pub created_at: DateTime<Utc>,
}

impl Jurisdiction {
    /// Granularity of this jurisdiction.
    pub fn granularity(&self) -> Granularity {
        self.kind.granularity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_validation() {
        assert!(JurisdictionId::new("us-ca-cd12").is_ok());
        assert!(JurisdictionId::new("custom:ward_3.north").is_ok());
        assert!(JurisdictionId::new("").is_err());
        assert!(JurisdictionId::new("US-CA").is_err());
        assert!(JurisdictionId::new("a b").is_err());
        assert!(JurisdictionId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_id_deserialize_validates() {
        let ok: Result<JurisdictionId, _> = serde_json::from_str("\"us-ny\"");
        assert!(ok.is_ok());
        let bad: Result<JurisdictionId, _> = serde_json::from_str("\"Not Valid\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_hierarchy_ranks() {
        assert!(Granularity::State.is_coarser_than(&Granularity::FederalDistrict));
        assert!(Granularity::State.is_coarser_than(&Granularity::County));
        assert!(Granularity::County.is_coarser_than(&Granularity::City));
        assert!(Granularity::City.is_coarser_than(&Granularity::SchoolBoard));

        assert!(!Granularity::County.is_coarser_than(&Granularity::FederalDistrict));
        assert!(!Granularity::City.is_coarser_than(&Granularity::City));
        assert!(!Granularity::SchoolBoard.is_coarser_than(&Granularity::State));

        assert!(Granularity::Custom(5).is_coarser_than(&Granularity::State));
        assert!(Granularity::City.is_coarser_than(&Granularity::Custom(35)));
    }

    #[test]
    fn test_kind_tagged_json() {
        let kind = JurisdictionKind::FederalDistrict {
            state_code: "CA".into(),
            number: 12,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["level"], "federal_district");
        assert_eq!(json["number"], 12);
        assert_eq!(kind.display_name(), "CA-12");
        assert_eq!(kind.granularity(), Granularity::FederalDistrict);
    }

    #[test]
    fn test_custom_kind_keeps_level_tag() {
        let json = r#"{"level":"custom","label":"ward 3","rank":45}"#;
        let kind: JurisdictionKind = serde_json::from_str(json).unwrap();
        assert_eq!(kind.granularity(), Granularity::Custom(45));
        let back = serde_json::to_value(&kind).unwrap();
        assert_eq!(back["level"], "custom");
        assert_eq!(back["rank"], 45);
    }
}
