//! Catalog sources: where raw per-locale key/value data comes from

use crate::error::{I18nError, I18nResult};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Raw key/value data for one locale, before flattening and normalization
pub type RawMessages = Mapping;

/// A supplier of raw catalog data for one locale.
///
/// Sources are retained by the catalog and read again on every reload.
pub trait CatalogSource: Send + Sync {
    /// Locale identifier this source provides, e.g. `de_DE`
    fn identifier(&self) -> &str;

    /// Read the current raw data
    fn read(&self) -> I18nResult<RawMessages>;
}

/// In-memory source, mostly useful for embedding and tests
#[derive(Debug, Clone)]
pub struct MemorySource {
    identifier: String,
    messages: RawMessages,
}

impl MemorySource {
    /// Create a source from an already built mapping
    pub fn new(identifier: impl Into<String>, messages: RawMessages) -> Self {
        Self {
            identifier: identifier.into(),
            messages,
        }
    }

    /// Create a source from key/value pairs
    pub fn from_pairs<K, V, I>(identifier: impl Into<String>, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let messages = pairs
            .into_iter()
            .map(|(k, v)| (Value::String(k.into()), v.into()))
            .collect();
        Self::new(identifier, messages)
    }

    /// Parse a YAML document held in memory
    pub fn from_yaml(identifier: impl Into<String>, yaml: &str) -> I18nResult<Self> {
        let identifier = identifier.into();
        let messages = parse_document(&identifier, yaml)?;
        Ok(Self { identifier, messages })
    }
}

impl CatalogSource for MemorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read(&self) -> I18nResult<RawMessages> {
        Ok(self.messages.clone())
    }
}

/// One YAML file per locale; the identifier is the file stem (`de_DE.yml` → `de_DE`)
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    identifier: String,
    path: PathBuf,
}

impl YamlFileSource {
    /// Create a source for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { identifier, path }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for YamlFileSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read(&self) -> I18nResult<RawMessages> {
        debug!(path = %self.path.display(), "Reading catalog file");
        let content = fs::read_to_string(&self.path).map_err(|source| I18nError::SourceRead {
            identifier: self.identifier.clone(),
            source,
        })?;
        parse_document(&self.identifier, &content)
    }
}

/// Enumerate `*.yml` / `*.yaml` files in `dir` as catalog sources, sorted by path
pub fn discover(dir: impl AsRef<Path>) -> I18nResult<Vec<Arc<dyn CatalogSource>>> {
    let dir = dir.as_ref();
    let read_err = |source| I18nError::SourceRead {
        identifier: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if is_yaml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    debug!(directory = %dir.display(), files = paths.len(), "Discovered catalog files");
    Ok(paths
        .into_iter()
        .map(|path| Arc::new(YamlFileSource::new(path)) as Arc<dyn CatalogSource>)
        .collect())
}

fn parse_document(identifier: &str, content: &str) -> I18nResult<RawMessages> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| I18nError::SourceParse {
        identifier: identifier.to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(I18nError::SourceParse {
            identifier: identifier.to_string(),
            message: format!("expected a mapping at the top level, found {}", kind(&other)),
        }),
    }
}

/// Flatten raw data into `(dotted.key, text)` pairs.
///
/// Scalars become their textual form, nested mappings contribute dotted keys
/// and sequences of scalars are joined with newlines.
pub fn flatten(identifier: &str, raw: &RawMessages) -> I18nResult<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(raw.len());
    flatten_into(identifier, None, raw, &mut out)?;
    Ok(out)
}

fn flatten_into(
    identifier: &str,
    prefix: Option<&str>,
    mapping: &Mapping,
    out: &mut Vec<(String, String)>,
) -> I18nResult<()> {
    for (key, value) in mapping {
        let key = scalar_text(key).ok_or_else(|| I18nError::SourceParse {
            identifier: identifier.to_string(),
            message: format!("unsupported key type {}", kind(key)),
        })?;
        let full_key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };

        match value {
            Value::Mapping(nested) => flatten_into(identifier, Some(&full_key), nested, out)?,
            Value::Sequence(items) => {
                let lines = items
                    .iter()
                    .map(|item| {
                        scalar_text(item).ok_or_else(|| I18nError::SourceParse {
                            identifier: identifier.to_string(),
                            message: format!("'{full_key}' contains a nested {}", kind(item)),
                        })
                    })
                    .collect::<I18nResult<Vec<_>>>()?;
                out.push((full_key, lines.join("\n")));
            }
            Value::Tagged(tagged) => match scalar_text(&tagged.value) {
                Some(text) => out.push((full_key, text)),
                None => {
                    return Err(I18nError::SourceParse {
                        identifier: identifier.to_string(),
                        message: format!("'{full_key}' has an unsupported tagged value"),
                    })
                }
            },
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    out.push((full_key, text));
                }
            }
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
