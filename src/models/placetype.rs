//! Placetype vocabulary for point-in-polygon lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category label attached to a place record.
///
/// Variants are declared coarsest first; the derived `Ord` is the hierarchical
/// rank used when ordering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Placetype {
    Planet,
    Continent,
    Ocean,
    Empire,
    Country,
    Dependency,
    Disputed,
    MarineArea,
    MacroRegion,
    Region,
    MacroCounty,
    County,
    LocalAdmin,
    Locality,
    Borough,
    Macrohood,
    Neighbourhood,
    Microhood,
    Campus,
    Postalcode,
    Building,
    Venue,
    Address,
    Timezone,
}

impl Placetype {
    /// All placetypes in hierarchical order (planet first)
    pub fn all() -> &'static [Placetype] {
        &[
            Placetype::Planet,
            Placetype::Continent,
            Placetype::Ocean,
            Placetype::Empire,
            Placetype::Country,
            Placetype::Dependency,
            Placetype::Disputed,
            Placetype::MarineArea,
            Placetype::MacroRegion,
            Placetype::Region,
            Placetype::MacroCounty,
            Placetype::County,
            Placetype::LocalAdmin,
            Placetype::Locality,
            Placetype::Borough,
            Placetype::Macrohood,
            Placetype::Neighbourhood,
            Placetype::Microhood,
            Placetype::Campus,
            Placetype::Postalcode,
            Placetype::Building,
            Placetype::Venue,
            Placetype::Address,
            Placetype::Timezone,
        ]
    }

    /// Wire name of this placetype
    pub fn as_str(&self) -> &'static str {
        match self {
            Placetype::Planet => "planet",
            Placetype::Continent => "continent",
            Placetype::Ocean => "ocean",
            Placetype::Empire => "empire",
            Placetype::Country => "country",
            Placetype::Dependency => "dependency",
            Placetype::Disputed => "disputed",
            Placetype::MarineArea => "marinearea",
            Placetype::MacroRegion => "macroregion",
            Placetype::Region => "region",
            Placetype::MacroCounty => "macrocounty",
            Placetype::County => "county",
            Placetype::LocalAdmin => "localadmin",
            Placetype::Locality => "locality",
            Placetype::Borough => "borough",
            Placetype::Macrohood => "macrohood",
            Placetype::Neighbourhood => "neighbourhood",
            Placetype::Microhood => "microhood",
            Placetype::Campus => "campus",
            Placetype::Postalcode => "postalcode",
            Placetype::Building => "building",
            Placetype::Venue => "venue",
            Placetype::Address => "address",
            Placetype::Timezone => "timezone",
        }
    }
}

impl fmt::Display for Placetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name does not match any known placetype.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown placetype '{0}'")]
pub struct UnknownPlacetype(pub String);

impl FromStr for Placetype {
    type Err = UnknownPlacetype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Placetype::all()
            .iter()
            .copied()
            .find(|pt| pt.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownPlacetype(s.to_string()))
    }
}
