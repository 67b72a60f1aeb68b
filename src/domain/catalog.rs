//! Index catalog: base indices, composite definitions and per-fund
//! benchmark assignments.

use crate::domain::composite::CompositeIndexSpec;
use crate::domain::error::NavlensError;
use crate::domain::universe::{UniverseError, parse_codes};
use crate::ports::config_port::ConfigPort;
use std::collections::{BTreeMap, HashMap};

pub const LEGACY_ALIASES_VERSION: u32 = 1;

/// Identifiers from earlier configuration files and their current form.
pub const LEGACY_ALIASES: [(&str, &str); 4] = [
    ("INDEX_SSE", "000001"),
    ("INDEX_HS300", "000300"),
    ("INDEX_HSI", "HSI"),
    ("INDEX_MED_INNOV", "MED_INNOV"),
];

const EXCHANGE_SUFFIXES: [&str; 6] = [".SH", ".SZ", ".HK", ".OF", ".SS", ".XSHE"];

pub const DEFAULT_BENCHMARK: &str = "000300";
pub const DEFAULT_COMPARISON: [&str; 3] = ["000300", "000001", "HSI"];

/// Strips one trailing exchange suffix.
pub fn normalize_code(id: &str) -> &str {
    EXCHANGE_SUFFIXES
        .iter()
        .find_map(|suffix| id.strip_suffix(suffix))
        .unwrap_or(id)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FundProfile {
    pub benchmark: Option<String>,
    pub comparison: Option<Vec<String>>,
    pub monthly_comparison: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeEntry {
    pub display_name: Option<String>,
    pub spec: CompositeIndexSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexCatalog {
    /// Base index id to optional display name.
    pub indices: BTreeMap<String, Option<String>>,
    pub composites: BTreeMap<String, CompositeEntry>,
    pub funds: HashMap<String, FundProfile>,
    pub default_benchmark: String,
    pub default_comparison: Vec<String>,
    pub subjects: Vec<String>,
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self {
            indices: BTreeMap::new(),
            composites: BTreeMap::new(),
            funds: HashMap::new(),
            default_benchmark: DEFAULT_BENCHMARK.to_string(),
            default_comparison: DEFAULT_COMPARISON.iter().map(|s| s.to_string()).collect(),
            subjects: Vec::new(),
        }
    }
}

fn list_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Vec<String>>, NavlensError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    parse_codes(&raw).map(Some).map_err(|e: UniverseError| {
        NavlensError::config_invalid(section, key, e.to_string())
    })
}

impl IndexCatalog {
    /// Reads `[benchmarks]`, `[index:ID]`, `[composite:ID]` and `[fund:ID]`
    /// sections.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NavlensError> {
        let mut catalog = IndexCatalog::default();

        if let Some(default) = config.get_string("benchmarks", "default") {
            catalog.default_benchmark = default;
        }
        if let Some(list) = list_value(config, "benchmarks", "comparison")? {
            catalog.default_comparison = list;
        }
        if let Some(list) = list_value(config, "benchmarks", "subjects")? {
            catalog.subjects = list;
        }

        for section in config.sections() {
            let Some((prefix, id)) = section.split_once(':') else {
                continue;
            };
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(NavlensError::ConfigInvalid {
                    section: section.clone(),
                    key: "<section>".into(),
                    reason: "empty identifier".into(),
                });
            }
            match prefix.trim() {
                "index" => {
                    catalog
                        .indices
                        .insert(id, config.get_string(&section, "display_name"));
                }
                "composite" => {
                    let components = config.get_string(&section, "components").ok_or_else(|| {
                        NavlensError::ConfigMissing {
                            section: section.clone(),
                            key: "components".into(),
                        }
                    })?;
                    let spec = CompositeIndexSpec::parse(id.clone(), &components)?;
                    catalog.composites.insert(
                        id,
                        CompositeEntry {
                            display_name: config.get_string(&section, "display_name"),
                            spec,
                        },
                    );
                }
                "fund" => {
                    let profile = FundProfile {
                        benchmark: config.get_string(&section, "benchmark"),
                        comparison: list_value(config, &section, "comparison")?,
                        monthly_comparison: list_value(config, &section, "monthly_comparison")?,
                    };
                    catalog.funds.insert(id, profile);
                }
                _ => {}
            }
        }

        Ok(catalog)
    }

    /// Maps legacy aliases, then strips exchange suffixes.
    pub fn canonical_id(&self, id: &str) -> String {
        let id = id.trim();
        if let Some((_, current)) = LEGACY_ALIASES.iter().find(|(legacy, _)| *legacy == id) {
            return current.to_string();
        }
        normalize_code(id).to_string()
    }

    pub fn composite(&self, id: &str) -> Option<&CompositeIndexSpec> {
        self.composites.get(&self.canonical_id(id)).map(|e| &e.spec)
    }

    pub fn is_composite(&self, id: &str) -> bool {
        self.composite(id).is_some()
    }

    pub fn is_base_index(&self, id: &str) -> bool {
        self.indices.contains_key(&self.canonical_id(id))
    }

    pub fn display_name(&self, id: &str) -> String {
        let canonical = self.canonical_id(id);
        let name = match self.composites.get(&canonical) {
            Some(entry) => entry.display_name.clone(),
            None => self.indices.get(&canonical).cloned().flatten(),
        };
        name.unwrap_or_else(|| id.to_string())
    }

    fn profile(&self, fund_id: &str) -> Option<&FundProfile> {
        self.funds.get(fund_id)
    }

    pub fn benchmark_for(&self, fund_id: &str) -> String {
        self.profile(fund_id)
            .and_then(|p| p.benchmark.clone())
            .unwrap_or_else(|| self.default_benchmark.clone())
    }

    /// The fund's benchmark followed by its comparison list, without
    /// duplicates.
    pub fn comparison_for(&self, fund_id: &str) -> Vec<String> {
        let mut ids = vec![self.benchmark_for(fund_id)];
        let list = self
            .profile(fund_id)
            .and_then(|p| p.comparison.as_ref())
            .unwrap_or(&self.default_comparison);
        for id in list {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// First monthly comparison index that is not the benchmark, else the
    /// first configured entry. Falls back to the comparison list when no
    /// monthly list is set.
    pub fn monthly_comparison_for(&self, fund_id: &str, benchmark: &str) -> Option<String> {
        let monthly = self
            .profile(fund_id)
            .and_then(|p| p.monthly_comparison.clone());
        let candidates: Vec<String> = match monthly {
            Some(list) if !list.is_empty() => list,
            _ => self
                .profile(fund_id)
                .and_then(|p| p.comparison.clone())
                .unwrap_or_else(|| self.default_comparison.clone()),
        };
        let bench = normalize_code(benchmark);
        candidates
            .iter()
            .find(|id| normalize_code(id) != bench)
            .or_else(|| candidates.first())
            .cloned()
    }

    /// Checks that every composite component is a declared base index.
    pub fn validate(&self) -> Result<(), NavlensError> {
        for (id, entry) in &self.composites {
            for component in entry.spec.components() {
                let canonical = self.canonical_id(&component.component_id);
                if !self.indices.contains_key(&canonical) {
                    return Err(NavlensError::InvalidComposite {
                        id: id.clone(),
                        reason: format!(
                            "component {} is not a declared index",
                            component.component_id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
