//! Turns benchmark identifiers into value series.

use crate::domain::catalog::IndexCatalog;
use crate::domain::composite;
use crate::domain::error::NavlensError;
use crate::domain::series::TimeSeries;
use crate::ports::data_port::{DataPort, SeriesKind};
use tracing::{debug, warn};

/// Resolves identifiers through the catalog. Composite identifiers are
/// synthesized from their components; everything else is fetched as a base
/// index.
pub struct SeriesResolver<'a> {
    catalog: &'a IndexCatalog,
    data_port: &'a dyn DataPort,
}

impl<'a> SeriesResolver<'a> {
    pub fn new(catalog: &'a IndexCatalog, data_port: &'a dyn DataPort) -> Self {
        Self { catalog, data_port }
    }

    /// An index with no stored data resolves to an empty series.
    pub fn resolve(&self, id: &str) -> Result<TimeSeries, NavlensError> {
        if self.catalog.is_composite(id) {
            return self.synthesize(id);
        }
        self.fetch_base(&self.catalog.canonical_id(id))
    }

    /// Resolves each id, pairing it with its display name.
    pub fn resolve_named(&self, ids: &[String]) -> Result<Vec<(String, TimeSeries)>, NavlensError> {
        ids.iter()
            .map(|id| Ok((self.catalog.display_name(id), self.resolve(id)?)))
            .collect()
    }

    fn fetch_base(&self, id: &str) -> Result<TimeSeries, NavlensError> {
        match self.data_port.fetch_series(id, SeriesKind::Index) {
            Ok(series) => Ok(series),
            Err(NavlensError::NoData { .. }) => {
                warn!(index = id, "no index data");
                Ok(TimeSeries::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Builds a composite from its declared components. Components must be
    /// declared base indices; one without data is left out of the blend.
    pub fn synthesize(&self, id: &str) -> Result<TimeSeries, NavlensError> {
        let spec = self
            .catalog
            .composite(id)
            .ok_or_else(|| NavlensError::UnknownIndex { id: id.to_string() })?;

        let mut fetched: Vec<(TimeSeries, f64)> = Vec::new();
        for component in spec.weighted_components() {
            let component_id = self.catalog.canonical_id(&component.component_id);
            if !self.catalog.is_base_index(&component_id) {
                return Err(NavlensError::UnknownIndex { id: component_id });
            }
            let series = self.fetch_base(&component_id)?;
            if series.is_empty() {
                warn!(composite = id, component = %component_id, "component skipped: no data");
                continue;
            }
            fetched.push((series, component.weight));
        }

        let inputs: Vec<(&TimeSeries, f64)> = fetched.iter().map(|(s, w)| (s, *w)).collect();
        let series = composite::build(&inputs);
        debug!(composite = id, components = inputs.len(), points = series.len(), "synthesized");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct StubData {
        indices: HashMap<String, TimeSeries>,
    }

    impl DataPort for StubData {
        fn fetch_series(&self, id: &str, kind: SeriesKind) -> Result<TimeSeries, NavlensError> {
            match kind {
                SeriesKind::Index => self
                    .indices
                    .get(id)
                    .cloned()
                    .ok_or_else(|| NavlensError::NoData { id: id.to_string() }),
                SeriesKind::Fund => Err(NavlensError::NoData { id: id.to_string() }),
            }
        }

        fn list_series(&self, _kind: SeriesKind) -> Result<Vec<String>, NavlensError> {
            Ok(self.indices.keys().cloned().collect())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::from_pairs(values.iter().enumerate().map(|(i, v)| (d(i as u32 + 1), *v)))
    }

    fn catalog(extra: &str) -> IndexCatalog {
        let text = format!(
            "[index:A]\ndisplay_name = Alpha\n[index:B]\n[index:C]\n\
             [composite:AB]\ndisplay_name = Blend\ncomponents = A:0.5, B:0.5\n{extra}"
        );
        IndexCatalog::from_config(&FileConfigAdapter::from_string(&text).unwrap()).unwrap()
    }

    fn data() -> StubData {
        let mut indices = HashMap::new();
        indices.insert("A".to_string(), series(&[100.0, 110.0, 121.0]));
        indices.insert("B".to_string(), series(&[50.0, 50.0, 50.0]));
        StubData { indices }
    }

    #[test]
    fn base_index_fetched_directly() {
        let catalog = catalog("");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        assert_eq!(resolver.resolve("A.SH").unwrap().values(), vec![100.0, 110.0, 121.0]);
    }

    #[test]
    fn base_index_without_data_is_empty() {
        let catalog = catalog("");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        assert!(resolver.resolve("C").unwrap().is_empty());
    }

    #[test]
    fn composite_blends_components() {
        let catalog = catalog("");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        let blended = resolver.resolve("AB").unwrap();
        assert_eq!(blended.len(), 3);
        assert_eq!(blended.values()[0], 1.0);
        assert!((blended.values()[1] - 1.05).abs() < 1e-12);
        assert!((blended.values()[2] - 1.05 * 1.05).abs() < 1e-12);
    }

    #[test]
    fn component_without_data_is_skipped() {
        let catalog = catalog("[composite:AC]\ncomponents = A:0.5, C:0.5\n");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        let blended = resolver.resolve("AC").unwrap();
        assert!((blended.values()[2] - 1.21).abs() < 1e-12);
    }

    #[test]
    fn undeclared_component_is_unknown_index() {
        let catalog = catalog("[composite:AZ]\ncomponents = A:0.5, Z:0.5\n");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        assert!(matches!(
            resolver.resolve("AZ"),
            Err(NavlensError::UnknownIndex { id }) if id == "Z"
        ));
    }

    #[test]
    fn named_resolution_uses_display_names() {
        let catalog = catalog("");
        let data = data();
        let resolver = SeriesResolver::new(&catalog, &data);
        let named = resolver
            .resolve_named(&["AB".to_string(), "B".to_string()])
            .unwrap();
        assert_eq!(named[0].0, "Blend");
        assert_eq!(named[1].0, "B");
    }
}
