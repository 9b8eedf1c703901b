// src/catalog/mod.rs

use encoding_rs::Encoding;
use serde::Deserialize;
use std::{
    collections::{hash_map::Entry, HashMap},
    fs,
    path::Path,
};
use tracing::debug;
use url::Url;

use crate::error::CatalogError;

/// The Vitibrasil downloads served by Embrapa. Every file carries three
/// identity columns (id, control code, product/country) before the years.
static BUILTIN_DATASETS: &[(&str, &str, &str)] = &[
    (
        "production",
        "http://vitibrasil.cnpuv.embrapa.br/download/Producao.csv",
        ";",
    ),
    (
        "processing",
        "http://vitibrasil.cnpuv.embrapa.br/download/ProcessaViniferas.csv",
        ";",
    ),
    (
        "trade",
        "http://vitibrasil.cnpuv.embrapa.br/download/Comercio.csv",
        ";",
    ),
    (
        "imports",
        "http://vitibrasil.cnpuv.embrapa.br/download/ImpVinhos.csv",
        "\t",
    ),
    (
        "exports",
        "http://vitibrasil.cnpuv.embrapa.br/download/ExpVinho.csv",
        "\t",
    ),
];

const DEFAULT_ENCODING: &str = "latin1";
const DEFAULT_FIXED_COLUMNS: usize = 3;

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

fn default_fixed_columns() -> usize {
    DEFAULT_FIXED_COLUMNS
}

/// One dataset entry as written in a catalog file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub url: String,
    pub separator: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_fixed_columns")]
    pub fixed_columns: usize,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    datasets: Vec<DatasetSpec>,
}

/// Validated, immutable description of one remote dataset.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub name: String,
    pub source_url: Url,
    separator: u8,
    encoding: &'static Encoding,
    pub fixed_columns: usize,
}

impl DatasetConfig {
    pub fn new(spec: DatasetSpec) -> Result<Self, CatalogError> {
        let separator = parse_separator(&spec.separator).ok_or_else(|| {
            CatalogError::InvalidSeparator {
                name: spec.name.clone(),
                separator: spec.separator.clone(),
            }
        })?;
        let encoding = Encoding::for_label(spec.encoding.trim().as_bytes()).ok_or_else(|| {
            CatalogError::UnknownEncoding {
                name: spec.name.clone(),
                label: spec.encoding.clone(),
            }
        })?;
        let source_url = Url::parse(&spec.url).map_err(|source| CatalogError::InvalidUrl {
            name: spec.name.clone(),
            url: spec.url.clone(),
            source,
        })?;

        Ok(Self {
            name: spec.name,
            source_url,
            separator,
            encoding,
            fixed_columns: spec.fixed_columns,
        })
    }

    /// Field separator as the single byte the CSV reader expects.
    pub fn separator(&self) -> u8 {
        self.separator
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

/// Accepts exactly one ASCII character, or the word `tab`.
fn parse_separator(raw: &str) -> Option<u8> {
    if raw.eq_ignore_ascii_case("tab") {
        return Some(b'\t');
    }
    match raw.as_bytes() {
        [b] if b.is_ascii() => Some(*b),
        _ => None,
    }
}

/// Read-only table of known datasets, keyed by name.
#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    datasets: HashMap<String, DatasetConfig>,
}

impl DatasetCatalog {
    /// Validate every spec; names must be unique.
    pub fn from_specs<I>(specs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = DatasetSpec>,
    {
        let mut datasets = HashMap::new();
        for spec in specs {
            let config = DatasetConfig::new(spec)?;
            match datasets.entry(config.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(CatalogError::Duplicate { name: config.name });
                }
                Entry::Vacant(slot) => {
                    slot.insert(config);
                }
            }
        }
        debug!(count = datasets.len(), "catalog built");
        Ok(Self { datasets })
    }

    /// The five Vitibrasil datasets.
    pub fn builtin() -> Self {
        let specs = BUILTIN_DATASETS
            .iter()
            .map(|&(name, url, separator)| DatasetSpec {
                name: name.to_string(),
                url: url.to_string(),
                separator: separator.to_string(),
                encoding: default_encoding(),
                fixed_columns: DEFAULT_FIXED_COLUMNS,
            });
        Self::from_specs(specs).expect("built-in catalog should be valid")
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        Self::from_specs(file.datasets)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn resolve(&self, name: &str) -> Result<&DatasetConfig, CatalogError> {
        self.datasets
            .get(name)
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }

    /// Dataset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
