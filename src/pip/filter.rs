//! Query filters built from request options.

use hashbrown::HashSet;
use std::str::FromStr;

use crate::error::FilterError;
use crate::models::{Existential, PlaceRecord, Placetype, PointInPolygonRequest};

/// Which geometries of a place are eligible to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometrySelection {
    All,
    #[default]
    Default,
    Alternate,
}

impl GeometrySelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometrySelection::All => "all",
            GeometrySelection::Default => "default",
            GeometrySelection::Alternate => "alternate",
        }
    }
}

impl FromStr for GeometrySelection {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(GeometrySelection::All),
            "default" => Ok(GeometrySelection::Default),
            "alternate" | "alt" => Ok(GeometrySelection::Alternate),
            _ => Err(FilterError::UnknownGeometries(s.to_string())),
        }
    }
}

/// Existential constraints; `None` means the flag is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExistentialFilters {
    is_current: Option<HashSet<Existential>>,
    is_ceased: Option<HashSet<Existential>>,
    is_deprecated: Option<HashSet<Existential>>,
    is_superseded: Option<HashSet<Existential>>,
    is_superseding: Option<HashSet<Existential>>,
}

impl ExistentialFilters {
    fn matches(&self, record: &PlaceRecord) -> bool {
        let check = |allowed: &Option<HashSet<Existential>>, value: Existential| {
            allowed.as_ref().map_or(true, |set| set.contains(&value))
        };

        check(&self.is_current, record.is_current)
            && check(&self.is_ceased, record.is_ceased)
            && check(&self.is_deprecated, record.is_deprecated)
            && check(&self.is_superseded, record.is_superseded)
            && check(&self.is_superseding, record.is_superseding)
    }
}

/// Constraints narrowing which places may match a lookup.
///
/// Built once per request by [`QueryFilter::from_request`] and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// `None` admits every placetype
    placetypes: Option<HashSet<Placetype>>,
    geometries: GeometrySelection,
    alt_labels: Option<HashSet<String>>,
    existential: ExistentialFilters,
    properties: Vec<String>,
}

impl QueryFilter {
    /// Build a filter from a request's options.
    ///
    /// Unknown names and contradictory combinations fail instead of degrading
    /// into a filter that matches everything or nothing.
    pub fn from_request(req: &PointInPolygonRequest) -> Result<Self, FilterError> {
        let placetypes = build_placetypes(
            req.placetypes.as_deref(),
            req.exclude_placetypes.as_deref(),
        )?;

        let geometries = build_geometries(req.is_alt, req.geometries.as_deref())?;

        let alt_labels = match &req.alternate_geometries {
            Some(_) if geometries == GeometrySelection::Default => {
                return Err(FilterError::AltLabelsWithoutAlternates);
            }
            Some(labels) if labels.is_empty() => {
                return Err(FilterError::AltLabelsWithoutAlternates);
            }
            Some(labels) => Some(labels.iter().map(|l| l.trim().to_string()).collect()),
            None => None,
        };

        let existential = ExistentialFilters {
            is_current: build_existential("is_current", req.is_current.as_deref())?,
            is_ceased: build_existential("is_ceased", req.is_ceased.as_deref())?,
            is_deprecated: build_existential("is_deprecated", req.is_deprecated.as_deref())?,
            is_superseded: build_existential("is_superseded", req.is_superseded.as_deref())?,
            is_superseding: build_existential("is_superseding", req.is_superseding.as_deref())?,
        };

        let mut properties: Vec<String> = Vec::new();
        for prop in req.properties.iter().flatten() {
            let prop = prop.trim();
            if prop.is_empty() {
                return Err(FilterError::EmptyProperty);
            }
            if !properties.iter().any(|p| p == prop) {
                properties.push(prop.to_string());
            }
        }

        Ok(Self {
            placetypes,
            geometries,
            alt_labels,
            existential,
            properties,
        })
    }

    /// Whether a record satisfies every constraint of this filter
    pub fn matches(&self, record: &PlaceRecord) -> bool {
        self.matches_placetype(record.placetype)
            && self.matches_geometry(record.is_alt, record.alt_label.as_deref())
            && self.existential.matches(record)
    }

    pub fn matches_placetype(&self, placetype: Placetype) -> bool {
        self.placetypes
            .as_ref()
            .map_or(true, |set| set.contains(&placetype))
    }

    pub fn matches_geometry(&self, is_alt: bool, alt_label: Option<&str>) -> bool {
        match (self.geometries, is_alt) {
            (GeometrySelection::Default, true) | (GeometrySelection::Alternate, false) => false,
            (_, false) => true,
            (_, true) => match (&self.alt_labels, alt_label) {
                (None, _) => true,
                (Some(labels), Some(label)) => labels.contains(label),
                (Some(_), None) => false,
            },
        }
    }

    pub fn geometries(&self) -> GeometrySelection {
        self.geometries
    }

    /// Properties to project into each matching record, in request order
    pub fn properties(&self) -> &[String] {
        &self.properties
    }
}

fn build_placetypes(
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> Result<Option<HashSet<Placetype>>, FilterError> {
    let excluded = exclude
        .unwrap_or_default()
        .iter()
        .map(|name| Placetype::from_str(name))
        .collect::<Result<HashSet<_>, _>>()?;

    let allowed = match include {
        Some([]) => return Err(FilterError::EmptyPlacetypes),
        Some(names) => names
            .iter()
            .map(|name| Placetype::from_str(name))
            .collect::<Result<HashSet<_>, _>>()?,
        None if excluded.is_empty() => return Ok(None),
        None => Placetype::all().iter().copied().collect(),
    };

    let remaining: HashSet<Placetype> = allowed.difference(&excluded).copied().collect();
    if remaining.is_empty() {
        return Err(FilterError::AllPlacetypesExcluded);
    }

    Ok(Some(remaining))
}

fn build_geometries(
    is_alt: Option<bool>,
    geometries: Option<&str>,
) -> Result<GeometrySelection, FilterError> {
    let selection = geometries.map(GeometrySelection::from_str).transpose()?;

    match (is_alt, selection) {
        (None, selection) => Ok(selection.unwrap_or_default()),
        (Some(true), None | Some(GeometrySelection::All | GeometrySelection::Alternate)) => {
            Ok(GeometrySelection::Alternate)
        }
        (Some(false), None | Some(GeometrySelection::All | GeometrySelection::Default)) => {
            Ok(GeometrySelection::Default)
        }
        (Some(is_alt), Some(selection)) => Err(FilterError::ContradictoryAlt {
            is_alt,
            geometries: selection.as_str().to_string(),
        }),
    }
}

fn build_existential(
    flag: &'static str,
    values: Option<&[i64]>,
) -> Result<Option<HashSet<Existential>>, FilterError> {
    let Some(values) = values else {
        return Ok(None);
    };

    if values.is_empty() {
        return Err(FilterError::EmptyExistential { flag });
    }

    values
        .iter()
        .map(|v| {
            Existential::try_from(*v)
                .map_err(|source| FilterError::InvalidExistential { flag, source })
        })
        .collect::<Result<HashSet<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PointInPolygonRequest {
        PointInPolygonRequest::new(0.0, 0.0)
    }

    fn record(placetype: Placetype) -> PlaceRecord {
        PlaceRecord::new(1, "test", placetype)
    }

    #[test]
    fn test_default_filter_matches_default_geometries_only() {
        let filter = QueryFilter::from_request(&request()).unwrap();
        assert!(filter.matches(&record(Placetype::Locality)));

        let mut alt = record(Placetype::Locality);
        alt.is_alt = true;
        assert!(!filter.matches(&alt));
    }

    #[test]
    fn test_placetype_allow_list() {
        let mut req = request();
        req.placetypes = Some(vec!["locality".into(), "region".into()]);
        let filter = QueryFilter::from_request(&req).unwrap();

        assert!(filter.matches_placetype(Placetype::Locality));
        assert!(filter.matches_placetype(Placetype::Region));
        assert!(!filter.matches_placetype(Placetype::Country));
    }

    #[test]
    fn test_exclusions_without_allow_list() {
        let mut req = request();
        req.exclude_placetypes = Some(vec!["neighbourhood".into()]);
        let filter = QueryFilter::from_request(&req).unwrap();

        assert!(filter.matches_placetype(Placetype::Country));
        assert!(!filter.matches_placetype(Placetype::Neighbourhood));
    }

    #[test]
    fn test_unknown_placetype_is_error() {
        let mut req = request();
        req.placetypes = Some(vec!["hamlet".into()]);
        assert!(matches!(
            QueryFilter::from_request(&req),
            Err(FilterError::UnknownPlacetype(_))
        ));
    }

    #[test]
    fn test_empty_allow_list_is_error() {
        let mut req = request();
        req.placetypes = Some(vec![]);
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::EmptyPlacetypes)
        );
    }

    #[test]
    fn test_exclusions_emptying_allow_list_is_error() {
        let mut req = request();
        req.placetypes = Some(vec!["locality".into()]);
        req.exclude_placetypes = Some(vec!["locality".into()]);
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::AllPlacetypesExcluded)
        );
    }

    #[test]
    fn test_is_alt_selects_alternates() {
        let mut req = request();
        req.is_alt = Some(true);
        let filter = QueryFilter::from_request(&req).unwrap();
        assert_eq!(filter.geometries(), GeometrySelection::Alternate);

        let mut alt = record(Placetype::Locality);
        alt.is_alt = true;
        alt.alt_label = Some("quattroshapes".into());
        assert!(filter.matches(&alt));
        assert!(!filter.matches(&record(Placetype::Locality)));
    }

    #[test]
    fn test_is_alt_contradicting_geometries() {
        let mut req = request();
        req.is_alt = Some(true);
        req.geometries = Some("default".into());
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::ContradictoryAlt {
                is_alt: true,
                geometries: "default".into()
            })
        );
    }

    #[test]
    fn test_unknown_geometries() {
        let mut req = request();
        req.geometries = Some("some".into());
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::UnknownGeometries("some".into()))
        );
    }

    #[test]
    fn test_alt_labels() {
        let mut req = request();
        req.geometries = Some("all".into());
        req.alternate_geometries = Some(vec!["quattroshapes".into()]);
        let filter = QueryFilter::from_request(&req).unwrap();

        assert!(filter.matches_geometry(false, None));
        assert!(filter.matches_geometry(true, Some("quattroshapes")));
        assert!(!filter.matches_geometry(true, Some("naturalearth")));
        assert!(!filter.matches_geometry(true, None));
    }

    #[test]
    fn test_alt_labels_require_alternates() {
        let mut req = request();
        req.alternate_geometries = Some(vec!["quattroshapes".into()]);
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::AltLabelsWithoutAlternates)
        );
    }

    #[test]
    fn test_existential_flags() {
        let mut req = request();
        req.is_current = Some(vec![1]);
        let filter = QueryFilter::from_request(&req).unwrap();

        let mut current = record(Placetype::Locality);
        current.is_current = Existential::True;
        assert!(filter.matches(&current));

        let mut ceased = record(Placetype::Locality);
        ceased.is_current = Existential::False;
        assert!(!filter.matches(&ceased));
    }

    #[test]
    fn test_invalid_existential_values() {
        let mut req = request();
        req.is_deprecated = Some(vec![3]);
        assert!(matches!(
            QueryFilter::from_request(&req),
            Err(FilterError::InvalidExistential {
                flag: "is_deprecated",
                ..
            })
        ));

        let mut req = request();
        req.is_ceased = Some(vec![]);
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::EmptyExistential { flag: "is_ceased" })
        );
    }

    #[test]
    fn test_properties_deduplicated() {
        let mut req = request();
        req.properties = Some(vec![
            "wof:hierarchy".into(),
            "wof:hierarchy".into(),
            "src:geom".into(),
        ]);
        let filter = QueryFilter::from_request(&req).unwrap();
        assert_eq!(filter.properties(), ["wof:hierarchy", "src:geom"]);

        req.properties = Some(vec![" ".into()]);
        assert_eq!(
            QueryFilter::from_request(&req),
            Err(FilterError::EmptyProperty)
        );
    }
}
