//! Capability catalog: the indexed, classified set of addressable symbols.
//!
//! Built once per process by [`CatalogService`] from the curated runtime
//! table plus any declared-only YAML manifests, then immutable.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::classify::classify;
use super::symbol::{BehaviorClass, CapabilitySymbol, PackageDescriptor, SymbolId, SymbolKind, SymbolOrigin};
use super::table::{self, member_name, Binding, PackageSpec};
use crate::config::CatalogConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::invocation::handlers::SymbolHandler;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Required package '{0}' is disabled by configuration")]
    RequiredDisabled(String),

    #[error("Failed to parse required manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid required manifest {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Failed to scan manifest directory {path}: {source}")]
    ManifestDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Manifests ────────────────────────────────────────────────────────────────

/// A declared-only package described in YAML.
///
/// ```yaml
/// package:
///   alias: voice
///   name: "@discordjs/voice"
///   version: "0.17.0"
///   required: false
/// symbols:
///   - name: joinVoiceChannel
///     kind: function
///     params: [config]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub package: ManifestPackage,
    #[serde(default)]
    pub symbols: Vec<ManifestSymbol>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestPackage {
    pub alias: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, alias = "docsBase")]
    pub docs_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSymbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Manifest {
    fn validate(&self) -> Result<(), String> {
        if self.package.alias.trim().is_empty() {
            return Err("package.alias must not be empty".to_string());
        }
        if let Some(sym) = self.symbols.iter().find(|s| s.name.trim().is_empty()) {
            return Err(format!("symbol of kind {} has an empty name", sym.kind));
        }
        Ok(())
    }
}

/// Collect `*.yaml` / `*.yml` files under `path`, recursively.
fn manifest_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }
    if !path.exists() {
        log::warn!("Manifest path {} does not exist", path.display());
        return Ok(());
    }
    let dir_err = |source| CatalogError::ManifestDir {
        path: path.to_path_buf(),
        source,
    };
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(dir_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for entry in entries {
        if entry.is_dir() {
            manifest_files(&entry, out)?;
        } else if entry
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml")
        {
            out.push(entry);
        }
    }
    Ok(())
}

/// Load one manifest. `Ok(None)` means an optional manifest was skipped.
fn load_manifest(path: &Path) -> Result<Option<Manifest>, CatalogError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Failed to read manifest {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let raw: serde_yaml::Value = match serde_yaml::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Failed to parse manifest {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    let required = raw
        .get("package")
        .and_then(|p| p.get("required"))
        .and_then(serde_yaml::Value::as_bool)
        .unwrap_or(false);

    let manifest: Manifest = match serde_yaml::from_value(raw) {
        Ok(manifest) => manifest,
        Err(source) if required => {
            return Err(CatalogError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            log::warn!("Skipping optional manifest {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    match manifest.validate() {
        Ok(()) => Ok(Some(manifest)),
        Err(message) if required => Err(CatalogError::ManifestInvalid {
            path: path.to_path_buf(),
            message,
        }),
        Err(message) => {
            log::warn!("Skipping optional manifest {}: {}", path.display(), message);
            Ok(None)
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// How to dispatch an invokable symbol.
#[derive(Debug, Clone)]
pub struct RuntimeEntry {
    pub binding: Binding,
    pub handler: Arc<dyn SymbolHandler>,
    /// `Owner#method` of the declaring class, or the function name
    pub canonical: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name_asc" | "asc" => Some(Self::NameAsc),
            "name_desc" | "desc" => Some(Self::NameDesc),
            _ => None,
        }
    }
}

/// Discovery filter. Empty sets match everything.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    /// Case-insensitive substring of the symbol name
    pub query: Option<String>,
    pub kinds: Vec<SymbolKind>,
    pub packages: Vec<String>,
    pub invokable_only: bool,
    pub behavior: Vec<BehaviorClass>,
    /// 1-based; 0 is treated as 1
    pub page: usize,
    pub page_size: Option<usize>,
    pub sort: SortOrder,
    pub include_kind_counts: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolPage {
    pub items: Vec<CapabilitySymbol>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_counts: Option<BTreeMap<SymbolKind, usize>>,
}

#[derive(Debug, Default)]
pub struct CapabilityCatalog {
    packages: Vec<PackageDescriptor>,
    symbols: Vec<CapabilitySymbol>,
    by_name: HashMap<String, Vec<usize>>,
    by_operation_key: HashMap<String, usize>,
    runtime: HashMap<SymbolId, RuntimeEntry>,
}

impl CapabilityCatalog {
    /// Build from the compiled-in packages and the configured manifests.
    pub fn build(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::build_from(table::builtin_packages(), config)
    }

    pub fn build_from(runtime_packages: Vec<PackageSpec>, config: &CatalogConfig) -> Result<Self, CatalogError> {
        let disabled: HashSet<String> = config
            .disabled_packages
            .iter()
            .map(|alias| alias.trim().to_ascii_lowercase())
            .collect();
        let is_disabled = |alias: &str| disabled.contains(&alias.to_ascii_lowercase());

        let mut catalog = Self::default();

        for spec in &runtime_packages {
            if is_disabled(spec.alias) {
                if spec.required {
                    return Err(CatalogError::RequiredDisabled(spec.alias.to_string()));
                }
                log::info!("Package {} disabled by configuration", spec.alias);
                continue;
            }
            catalog.add_runtime_package(spec);
        }

        let mut files = Vec::new();
        for path in &config.manifest_paths {
            manifest_files(path, &mut files)?;
        }
        for path in files {
            let Some(manifest) = load_manifest(&path)? else {
                continue;
            };
            let alias = manifest.package.alias.clone();
            if is_disabled(&alias) {
                if manifest.package.required {
                    return Err(CatalogError::RequiredDisabled(alias));
                }
                log::info!("Package {} disabled by configuration", alias);
                continue;
            }
            if catalog.packages.iter().any(|p| p.alias == alias) {
                if manifest.package.required {
                    return Err(CatalogError::ManifestInvalid {
                        path,
                        message: format!("package alias '{}' is already registered", alias),
                    });
                }
                log::warn!("Skipping manifest {}: package alias '{}' already registered", path.display(), alias);
                continue;
            }
            catalog.add_declared_package(manifest);
        }

        catalog.finish();
        log::info!(
            "Capability catalog built: {} packages, {} symbols ({} invokable)",
            catalog.packages.len(),
            catalog.symbols.len(),
            catalog.runtime.len()
        );
        Ok(catalog)
    }

    fn add_runtime_package(&mut self, spec: &PackageSpec) {
        let docs_base = spec.docs_base;
        let alias = spec.alias;
        let start = self.symbols.len();
        let symbol = |name: String, kind: SymbolKind| CapabilitySymbol {
            operation_key: CapabilitySymbol::operation_key_for(alias, &name),
            docs_path: CapabilitySymbol::docs_path_for(docs_base, kind, &name),
            behavior_class: classify(&name, kind),
            name,
            kind,
            package: alias.to_string(),
            origin: SymbolOrigin::Runtime,
            invokable: false,
            declared_on: None,
            alias_of: None,
            params: Vec::new(),
            description: None,
        };

        for class in &spec.classes {
            let mut class_symbol = symbol(class.name.to_string(), SymbolKind::Class);
            if !class.description.is_empty() {
                class_symbol.description = Some(class.description.to_string());
            }
            self.symbols.push(class_symbol);

            for (method, owner) in spec.expanded_methods(class) {
                let name = class.member_name(method);
                let canonical = member_name(owner, method.name, method.is_static);
                let mut sym = symbol(name, SymbolKind::Function);
                sym.invokable = true;
                sym.declared_on = Some(owner.to_string());
                sym.params = method.params.iter().map(|p| p.to_string()).collect();
                if canonical != sym.name {
                    // aliases never look safer than their owner
                    sym.behavior_class = sym.behavior_class.max(classify(&canonical, SymbolKind::Function));
                    sym.alias_of = Some(canonical.clone());
                }
                let binding = if method.is_static { Binding::Static } else { class.binding };
                self.runtime.insert(
                    sym.id(),
                    RuntimeEntry {
                        binding,
                        handler: method.handler.clone(),
                        canonical,
                    },
                );
                self.symbols.push(sym);
            }
        }

        for function in &spec.functions {
            let mut sym = symbol(function.name.to_string(), SymbolKind::Function);
            sym.invokable = true;
            sym.params = function.params.iter().map(|p| p.to_string()).collect();
            if !function.description.is_empty() {
                sym.description = Some(function.description.to_string());
            }
            self.runtime.insert(
                sym.id(),
                RuntimeEntry {
                    binding: Binding::Static,
                    handler: function.handler.clone(),
                    canonical: function.name.to_string(),
                },
            );
            self.symbols.push(sym);
        }

        for decl in &spec.declarations {
            let mut sym = symbol(decl.name.to_string(), decl.kind);
            if !decl.description.is_empty() {
                sym.description = Some(decl.description.to_string());
            }
            self.symbols.push(sym);
        }

        self.packages.push(PackageDescriptor {
            alias: alias.to_string(),
            name: spec.name.to_string(),
            version: spec.version.to_string(),
            description: spec.description.to_string(),
            required: spec.required,
            origin: SymbolOrigin::Runtime,
            docs_base: docs_base.map(String::from),
            symbol_count: self.symbols.len() - start,
        });
    }

    fn add_declared_package(&mut self, manifest: Manifest) {
        let Manifest { package, symbols } = manifest;
        let count = symbols.len();
        for declared in symbols {
            let name = declared.name;
            let kind = declared.kind;
            let declared_on = name
                .split_once(['#', '.'])
                .map(|(class, _)| class.to_string());
            self.symbols.push(CapabilitySymbol {
                operation_key: CapabilitySymbol::operation_key_for(&package.alias, &name),
                docs_path: CapabilitySymbol::docs_path_for(package.docs_base.as_deref(), kind, &name),
                behavior_class: classify(&name, kind),
                name,
                kind,
                package: package.alias.clone(),
                origin: SymbolOrigin::DeclaredOnly,
                invokable: false,
                declared_on,
                alias_of: None,
                params: declared.params,
                description: declared.description,
            });
        }
        log::debug!("Loaded declared-only package {} ({} symbols)", package.alias, count);
        self.packages.push(PackageDescriptor {
            alias: package.alias,
            name: package.name,
            version: package.version,
            description: package.description,
            required: package.required,
            origin: SymbolOrigin::DeclaredOnly,
            docs_base: package.docs_base,
            symbol_count: count,
        });
    }

    /// Sort and index.
    fn finish(&mut self) {
        self.packages.sort_by(|a, b| a.alias.cmp(&b.alias));
        self.symbols.sort_by(|a, b| {
            (a.name.as_str(), a.kind, a.package.as_str()).cmp(&(b.name.as_str(), b.kind, b.package.as_str()))
        });
        self.by_name.clear();
        self.by_operation_key.clear();
        for (index, sym) in self.symbols.iter().enumerate() {
            self.by_name.entry(sym.name.clone()).or_default().push(index);
            let slot = self.by_operation_key.entry(sym.operation_key.clone()).or_insert(index);
            // an invokable symbol owns its operation key
            if sym.invokable && !self.symbols[*slot].invokable {
                *slot = index;
            }
        }
    }

    pub fn list_packages(&self) -> Vec<PackageDescriptor> {
        self.packages.clone()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn get_symbols(&self, filter: &SymbolFilter) -> GatewayResult<SymbolPage> {
        let packages: Vec<String> = filter.packages.iter().map(|p| p.trim().to_string()).collect();
        if let Some(unknown) = packages.iter().find(|p| !self.packages.iter().any(|d| &d.alias == *p)) {
            return Err(GatewayError::Validation(format!(
                "unknown package '{}'; known packages: {}",
                unknown,
                self.package_aliases().join(", ")
            )));
        }
        let query = filter
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let mut matched: Vec<&CapabilitySymbol> = self
            .symbols
            .iter()
            .filter(|s| filter.kinds.is_empty() || filter.kinds.contains(&s.kind))
            .filter(|s| packages.is_empty() || packages.contains(&s.package))
            .filter(|s| !filter.invokable_only || s.invokable)
            .filter(|s| filter.behavior.is_empty() || filter.behavior.contains(&s.behavior_class))
            .filter(|s| query.as_ref().map_or(true, |q| s.name.to_lowercase().contains(q)))
            .collect();

        if filter.sort == SortOrder::NameDesc {
            matched.sort_by(|a, b| {
                b.name
                    .cmp(&a.name)
                    .then(a.kind.cmp(&b.kind))
                    .then(a.package.cmp(&b.package))
            });
        }

        let kind_counts = filter.include_kind_counts.then(|| {
            let mut counts = BTreeMap::new();
            for sym in &matched {
                *counts.entry(sym.kind).or_insert(0) += 1;
            }
            counts
        });

        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.max(1);
        let total = matched.len();
        let items = matched
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Ok(SymbolPage {
            items,
            total,
            page,
            page_size,
            kind_counts,
        })
    }

    fn package_aliases(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.alias.as_str()).collect()
    }

    /// Exact lookup by name, optionally scoped to a package.
    pub fn lookup(&self, name: &str, package: Option<&str>) -> GatewayResult<&CapabilitySymbol> {
        let name = name.trim();
        let candidates: Vec<&CapabilitySymbol> = self
            .by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&i| &self.symbols[i])
            .filter(|s| package.map_or(true, |p| s.package == p.trim()))
            .collect();

        if candidates.is_empty() {
            return Err(GatewayError::UnknownSymbol(match package {
                Some(p) => format!("{} in package {}", name, p),
                None => name.to_string(),
            }));
        }

        let mut in_packages: Vec<&str> = candidates.iter().map(|s| s.package.as_str()).collect();
        in_packages.sort_unstable();
        in_packages.dedup();
        if in_packages.len() > 1 {
            return Err(GatewayError::Validation(format!(
                "symbol '{}' is ambiguous; specify a package: {}",
                name,
                in_packages.join(", ")
            )));
        }

        // same name, several kinds: prefer what can be called
        let best = candidates
            .iter()
            .find(|s| s.invokable)
            .or_else(|| candidates.iter().find(|s| s.kind == SymbolKind::Class))
            .unwrap_or(&candidates[0]);
        Ok(*best)
    }

    /// Lookup by `"{package}::{name}"`.
    pub fn lookup_operation_key(&self, key: &str) -> GatewayResult<&CapabilitySymbol> {
        let key = key.trim();
        if !key.contains("::") {
            return Err(GatewayError::Validation(format!(
                "operationKey '{}' must have the form package::name",
                key
            )));
        }
        self.by_operation_key
            .get(key)
            .map(|&i| &self.symbols[i])
            .ok_or_else(|| GatewayError::UnknownSymbol(key.to_string()))
    }

    pub fn runtime_entry(&self, id: &SymbolId) -> Option<&RuntimeEntry> {
        self.runtime.get(id)
    }
}

/// Lazily built, process-wide catalog.
#[derive(Debug)]
pub struct CatalogService {
    config: CatalogConfig,
    cell: OnceCell<Arc<CapabilityCatalog>>,
}

impl CatalogService {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already built catalog.
    pub fn from_catalog(catalog: CapabilityCatalog) -> Self {
        Self {
            config: CatalogConfig::default(),
            cell: OnceCell::with_value(Arc::new(catalog)),
        }
    }

    pub fn catalog(&self) -> Result<Arc<CapabilityCatalog>, CatalogError> {
        self.cell
            .get_or_try_init(|| CapabilityCatalog::build(&self.config).map(Arc::new))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn builtin() -> CapabilityCatalog {
        CapabilityCatalog::build(&CatalogConfig::default()).unwrap()
    }

    fn write_manifest(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_builtin_packages_sorted() {
        let catalog = builtin();
        let aliases: Vec<String> = catalog.list_packages().into_iter().map(|p| p.alias).collect();
        assert_eq!(aliases, vec!["builders", "discord"]);
        let discord = catalog.list_packages().into_iter().find(|p| p.alias == "discord").unwrap();
        assert!(discord.required);
        assert!(discord.symbol_count > 100);
    }

    #[test]
    fn test_inherited_method_aliases_owner() {
        let catalog = builtin();
        let send = catalog.lookup("TextChannel#send", None).unwrap();
        assert!(send.invokable);
        assert_eq!(send.declared_on.as_deref(), Some("TextBasedChannel"));
        assert_eq!(send.alias_of.as_deref(), Some("TextBasedChannel#send"));
        assert_eq!(send.behavior_class, BehaviorClass::Write);
        assert_eq!(send.operation_key, "discord::TextChannel#send");
        assert_eq!(
            send.docs_path.as_deref(),
            Some("https://discord.js.org/docs/packages/discord.js/14.16.3/function/TextChannel#send")
        );

        let entry = catalog.runtime_entry(&send.id()).unwrap();
        assert_eq!(entry.canonical, "TextBasedChannel#send");
        assert_eq!(entry.binding, Binding::Live(crate::context::TargetKind::Channel));
    }

    #[test]
    fn test_classes_and_declarations_not_invokable() {
        let catalog = builtin();
        let guild = catalog.lookup("Guild", Some("discord")).unwrap();
        assert_eq!(guild.kind, SymbolKind::Class);
        assert!(!guild.invokable);
        let event = catalog.lookup("guildBanAdd", None).unwrap();
        assert_eq!(event.kind, SymbolKind::Event);
        assert_eq!(event.behavior_class, BehaviorClass::Read);
    }

    #[test]
    fn test_ambiguous_lookup_lists_packages() {
        let catalog = builtin();
        let err = catalog.lookup("version", None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("builders, discord"));
        assert_eq!(catalog.lookup("version", Some("builders")).unwrap().kind, SymbolKind::Variable);
        assert!(matches!(
            catalog.lookup("nope", None),
            Err(GatewayError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_operation_key_lookup() {
        let catalog = builtin();
        let sym = catalog.lookup_operation_key("discord::Message#pin").unwrap();
        assert_eq!(sym.name, "Message#pin");
        assert!(catalog.lookup_operation_key("Message#pin").unwrap_err().is_validation());
    }

    #[test]
    fn test_get_symbols_filters_and_pages() {
        let catalog = builtin();
        let page = catalog
            .get_symbols(&SymbolFilter {
                query: Some("MESSAGE#".into()),
                kinds: vec![SymbolKind::Function],
                page: 1,
                page_size: Some(3),
                include_kind_counts: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.total > 3);
        assert_eq!(page.kind_counts.as_ref().unwrap()[&SymbolKind::Function], page.total);
        let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let desc = catalog
            .get_symbols(&SymbolFilter {
                query: Some("message#".into()),
                sort: SortOrder::NameDesc,
                page_size: Some(1000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(desc.page_size, MAX_PAGE_SIZE);
        assert_eq!(desc.total, page.total);
        assert!(desc.items.first().unwrap().name >= desc.items.last().unwrap().name);
    }

    #[test]
    fn test_get_symbols_behavior_and_invokable() {
        let catalog = builtin();
        let dangerous = catalog
            .get_symbols(&SymbolFilter {
                behavior: vec![BehaviorClass::Dangerous],
                invokable_only: true,
                page_size: Some(MAX_PAGE_SIZE),
                ..Default::default()
            })
            .unwrap();
        assert!(dangerous.items.iter().any(|s| s.name == "TextChannel#bulkDelete"));
        assert!(dangerous.items.iter().all(|s| s.invokable));

        let err = catalog
            .get_symbols(&SymbolFilter {
                packages: vec!["nope".into()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_declared_manifest_loaded_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write_manifest(
            &nested,
            "voice.yaml",
            r#"
package:
  alias: voice
  name: "@discordjs/voice"
  version: "0.17.0"
  docs_base: https://docs.example/voice
symbols:
  - name: joinVoiceChannel
    kind: function
    params: [config]
  - name: VoiceConnection#destroy
    kind: function
  - name: VoiceConnectionStatus
    kind: enum
"#,
        );
        write_manifest(dir.path(), "broken.yml", "package: [not, a, map]");
        write_manifest(dir.path(), "notes.txt", "ignored");

        let catalog = CapabilityCatalog::build(&CatalogConfig {
            manifest_paths: vec![dir.path().to_path_buf()],
            disabled_packages: vec![],
        })
        .unwrap();

        let voice = catalog.list_packages().into_iter().find(|p| p.alias == "voice").unwrap();
        assert_eq!(voice.origin, SymbolOrigin::DeclaredOnly);
        assert_eq!(voice.symbol_count, 3);

        let destroy = catalog.lookup("VoiceConnection#destroy", None).unwrap();
        assert!(!destroy.invokable);
        assert_eq!(destroy.origin, SymbolOrigin::DeclaredOnly);
        assert_eq!(destroy.behavior_class, BehaviorClass::Dangerous);
        assert_eq!(destroy.declared_on.as_deref(), Some("VoiceConnection"));
        assert!(catalog.runtime_entry(&destroy.id()).is_none());
    }

    #[test]
    fn test_required_manifest_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            "core.yaml",
            "package:\n  alias: core\n  required: true\nsymbols: 12\n",
        );
        let err = CapabilityCatalog::build(&CatalogConfig {
            manifest_paths: vec![dir.path().to_path_buf()],
            disabled_packages: vec![],
        })
        .unwrap_err();
        assert!(matches!(err, CatalogError::ManifestParse { .. }));
    }

    #[test]
    fn test_disabling_packages() {
        let without_builders = CapabilityCatalog::build(&CatalogConfig {
            manifest_paths: vec![],
            disabled_packages: vec!["Builders".into()],
        })
        .unwrap();
        assert!(without_builders.lookup("EmbedBuilder", None).is_err());

        let err = CapabilityCatalog::build(&CatalogConfig {
            manifest_paths: vec![],
            disabled_packages: vec!["discord".into()],
        })
        .unwrap_err();
        assert!(matches!(err, CatalogError::RequiredDisabled(alias) if alias == "discord"));
    }

    #[test]
    fn test_service_builds_once() {
        let service = CatalogService::new(CatalogConfig::default());
        let a = service.catalog().unwrap();
        let b = service.catalog().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
