//! Catalog records: symbols, their kinds and risk classes, and package descriptors.
//!
//! A symbol is one addressable name on the Discord client surface. Instance
//! and static methods are `function` symbols named `Class#method` and
//! `Class.method`, with `declared_on` pointing at the owning class.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declaration kind of a catalog symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Enum,
    Interface,
    Function,
    Type,
    Const,
    Variable,
    Event,
    Namespace,
    External,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 10] = [
        SymbolKind::Class,
        SymbolKind::Enum,
        SymbolKind::Interface,
        SymbolKind::Function,
        SymbolKind::Type,
        SymbolKind::Const,
        SymbolKind::Variable,
        SymbolKind::Event,
        SymbolKind::Namespace,
        SymbolKind::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Type => "type",
            Self::Const => "const",
            Self::Variable => "variable",
            Self::Event => "event",
            Self::Namespace => "namespace",
            Self::External => "external",
        }
    }

    /// Parse a kind name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|k| k.as_str() == normalized)
    }

    /// Kinds whose values can be called or constructed at runtime.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Class | Self::Function)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolOrigin {
    /// Backed by a runtime handler in the curated table.
    Runtime,
    /// Known from a declaration manifest only; never invokable.
    DeclaredOnly,
}

/// Risk tag derived from a symbol's name and kind.
///
/// Ordered by severity: `Read < Unknown < Write < Admin < Dangerous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    Read,
    Unknown,
    Write,
    Admin,
    Dangerous,
}

impl BehaviorClass {
    pub const ALL: [BehaviorClass; 5] = [
        BehaviorClass::Read,
        BehaviorClass::Unknown,
        BehaviorClass::Write,
        BehaviorClass::Admin,
        BehaviorClass::Dangerous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Unknown => "unknown",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::Dangerous => "dangerous",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|c| c.as_str() == normalized)
    }

    /// `write`, `admin` and `dangerous` calls need `allowWrite=true`.
    pub fn requires_write_guard(&self) -> bool {
        matches!(self, Self::Write | Self::Admin | Self::Dangerous)
    }
}

impl fmt::Display for BehaviorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identity of a symbol: `(package alias, kind, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId {
    pub package: String,
    pub kind: SymbolKind,
    pub name: String,
}

impl SymbolId {
    pub fn new(package: impl Into<String>, kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package, self.kind, self.name)
    }
}

/// One entry of the capability catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySymbol {
    /// `Class`, `Class#method`, `Class.method`, or a top-level export name
    pub name: String,

    pub kind: SymbolKind,

    /// Alias of the package that exports the symbol
    pub package: String,

    pub origin: SymbolOrigin,

    pub behavior_class: BehaviorClass,

    /// True only for function symbols with a runtime handler
    pub invokable: bool,

    /// Stable `"{package}::{name}"` key accepted by `symbols.invoke`
    pub operation_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_path: Option<String>,

    /// Owning class for methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_on: Option<String>,

    /// Canonical `Base#method` for methods inherited through `extends`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,

    /// Declared parameter names, in positional order
    #[serde(default)]
    pub params: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CapabilitySymbol {
    pub fn id(&self) -> SymbolId {
        SymbolId::new(self.package.clone(), self.kind, self.name.clone())
    }

    /// Build the `operationKey` for a symbol name in a package.
    pub fn operation_key_for(package: &str, name: &str) -> String {
        format!("{}::{}", package, name)
    }

    /// Build the docs path under a package docs base.
    pub fn docs_path_for(docs_base: Option<&str>, kind: SymbolKind, name: &str) -> Option<String> {
        docs_base.map(|base| format!("{}/{}/{}", base.trim_end_matches('/'), kind, name))
    }
}

/// Summary of one package contributing symbols to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    pub alias: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub required: bool,
    pub origin: SymbolOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_base: Option<String>,
    pub symbol_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(SymbolKind::parse("Class"), Some(SymbolKind::Class));
        assert_eq!(SymbolKind::parse(" event "), Some(SymbolKind::Event));
        assert_eq!(SymbolKind::parse("method"), None);
    }

    #[test]
    fn test_behavior_ordering_and_guard() {
        assert!(BehaviorClass::Dangerous > BehaviorClass::Admin);
        assert!(BehaviorClass::Unknown > BehaviorClass::Read);
        assert!(!BehaviorClass::Unknown.requires_write_guard());
        assert!(BehaviorClass::Admin.requires_write_guard());
    }

    #[test]
    fn test_docs_path_and_operation_key() {
        assert_eq!(
            CapabilitySymbol::docs_path_for(Some("https://docs.example/"), SymbolKind::Class, "Guild"),
            Some("https://docs.example/class/Guild".to_string())
        );
        assert_eq!(CapabilitySymbol::docs_path_for(None, SymbolKind::Class, "Guild"), None);
        assert_eq!(
            CapabilitySymbol::operation_key_for("discord", "Message#pin"),
            "discord::Message#pin"
        );
    }

    #[test]
    fn test_symbol_serializes_camel_case() {
        let sym = CapabilitySymbol {
            name: "Message#pin".into(),
            kind: SymbolKind::Function,
            package: "discord".into(),
            origin: SymbolOrigin::Runtime,
            behavior_class: BehaviorClass::Write,
            invokable: true,
            operation_key: "discord::Message#pin".into(),
            docs_path: None,
            declared_on: Some("Message".into()),
            alias_of: None,
            params: vec!["reason".into()],
            description: None,
        };
        let json = serde_json::to_value(&sym).unwrap();
        assert_eq!(json["behaviorClass"], "write");
        assert_eq!(json["declaredOn"], "Message");
        assert!(json.get("aliasOf").is_none());
    }
}
