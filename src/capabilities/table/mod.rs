//! Curated capability table.
//!
//! Each runtime package is a static description of classes, their methods,
//! top-level functions and non-callable declarations. Every callable entry
//! carries the [`SymbolHandler`] that executes it. The catalog indexes these
//! tables once per process.

pub mod builders;
pub mod discord;

use std::fmt;
use std::sync::Arc;

use crate::capabilities::symbol::SymbolKind;
use crate::context::TargetKind;
use crate::invocation::handlers::SymbolHandler;

/// What an instance method of a class is bound against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A live entity resolved from the invocation context
    Live(TargetKind),
    /// The connected client itself
    Client,
    /// Local state passed as `target.data` (builders and containers)
    Local,
    /// No instance form; static methods only
    Static,
}

impl Binding {
    pub fn label(&self) -> String {
        match self {
            Self::Live(kind) => format!("live:{}", kind),
            Self::Client => "client".to_string(),
            Self::Local => "local".to_string(),
            Self::Static => "static".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct MethodSpec {
    pub name: &'static str,
    pub is_static: bool,
    pub params: &'static [&'static str],
    pub handler: Arc<dyn SymbolHandler>,
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub name: &'static str,
    /// Base classes, nearest first
    pub extends: &'static [&'static str],
    pub binding: Binding,
    pub description: &'static str,
    pub methods: Vec<MethodSpec>,
}

impl ClassSpec {
    pub fn new(name: &'static str, binding: Binding) -> Self {
        Self {
            name,
            extends: &[],
            binding,
            description: "",
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, bases: &'static [&'static str]) -> Self {
        self.extends = bases;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn method<H>(mut self, name: &'static str, params: &'static [&'static str], handler: H) -> Self
    where
        H: SymbolHandler + 'static,
    {
        self.methods.push(MethodSpec {
            name,
            is_static: false,
            params,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn static_method<H>(mut self, name: &'static str, params: &'static [&'static str], handler: H) -> Self
    where
        H: SymbolHandler + 'static,
    {
        self.methods.push(MethodSpec {
            name,
            is_static: true,
            params,
            handler: Arc::new(handler),
        });
        self
    }

    /// Catalog name of one of this class's methods.
    pub fn member_name(&self, method: &MethodSpec) -> String {
        member_name(self.name, method.name, method.is_static)
    }
}

pub fn member_name(class: &str, method: &str, is_static: bool) -> String {
    let sep = if is_static { '.' } else { '#' };
    format!("{}{}{}", class, sep, method)
}

#[derive(Clone)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub description: &'static str,
    pub handler: Arc<dyn SymbolHandler>,
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// A non-callable declaration: enum, const, event, interface, ...
#[derive(Debug, Clone, Copy)]
pub struct DeclSpec {
    pub name: &'static str,
    pub kind: SymbolKind,
    pub description: &'static str,
}

/// One runtime package of the curated table.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub alias: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub docs_base: Option<&'static str>,
    pub classes: Vec<ClassSpec>,
    pub functions: Vec<FunctionSpec>,
    pub declarations: Vec<DeclSpec>,
}

impl PackageSpec {
    pub fn class(&self, name: &str) -> Option<&ClassSpec> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn function<H>(mut self, name: &'static str, params: &'static [&'static str], description: &'static str, handler: H) -> Self
    where
        H: SymbolHandler + 'static,
    {
        self.functions.push(FunctionSpec {
            name,
            params,
            description,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn declare(mut self, kind: SymbolKind, names: &[&'static str], description: &'static str) -> Self {
        self.declarations
            .extend(names.iter().map(|&name| DeclSpec { name, kind, description }));
        self
    }

    /// Methods of `class` including everything inherited through `extends`.
    ///
    /// Own methods shadow inherited ones; among bases the first declared
    /// wins. Each entry pairs the method with the class that declares it.
    pub fn expanded_methods<'a>(&'a self, class: &'a ClassSpec) -> Vec<(&'a MethodSpec, &'a str)> {
        let mut out: Vec<(&MethodSpec, &str)> = Vec::new();
        let mut visited: Vec<&str> = Vec::new();
        self.collect_methods(class, &mut out, &mut visited);
        out
    }

    fn collect_methods<'a>(
        &'a self,
        class: &'a ClassSpec,
        out: &mut Vec<(&'a MethodSpec, &'a str)>,
        visited: &mut Vec<&'a str>,
    ) {
        if visited.contains(&class.name) {
            return;
        }
        visited.push(class.name);

        for method in &class.methods {
            let taken = out
                .iter()
                .any(|(m, _)| m.name == method.name && m.is_static == method.is_static);
            if !taken {
                out.push((method, class.name));
            }
        }
        for base in class.extends {
            match self.class(base) {
                Some(base_class) => self.collect_methods(base_class, out, visited),
                None => log::warn!("Class {} extends unknown class {}", class.name, base),
            }
        }
    }
}

/// Runtime packages compiled into the binary.
pub fn builtin_packages() -> Vec<PackageSpec> {
    vec![discord::package(), builders::package()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::handlers::RouteHandler;

    fn package() -> PackageSpec {
        PackageSpec {
            alias: "test",
            name: "test",
            version: "0.0.0",
            description: "",
            required: false,
            docs_base: None,
            classes: vec![
                ClassSpec::new("Base", Binding::Live(TargetKind::Channel))
                    .method("fetch", &[], RouteHandler::get("/base"))
                    .method("send", &["options"], RouteHandler::post("/base")),
                ClassSpec::new("Mixin", Binding::Live(TargetKind::Channel))
                    .method("send", &["content"], RouteHandler::post("/mixin"))
                    .method("typing", &[], RouteHandler::post("/typing")),
                ClassSpec::new("Leaf", Binding::Live(TargetKind::Channel))
                    .extends(&["Base", "Mixin"])
                    .method("fetch", &["force"], RouteHandler::get("/leaf")),
            ],
            functions: Vec::new(),
            declarations: Vec::new(),
        }
    }

    #[test]
    fn test_expanded_methods_precedence() {
        let pkg = package();
        let leaf = pkg.class("Leaf").unwrap();
        let methods: Vec<(String, &str)> = pkg
            .expanded_methods(leaf)
            .into_iter()
            .map(|(m, owner)| (leaf.member_name(m), owner))
            .collect();
        assert_eq!(
            methods,
            vec![
                ("Leaf#fetch".to_string(), "Leaf"),
                ("Leaf#send".to_string(), "Base"),
                ("Leaf#typing".to_string(), "Mixin"),
            ]
        );
    }

    #[test]
    fn test_builtin_packages_have_unique_members() {
        for pkg in builtin_packages() {
            let mut names = Vec::new();
            for class in &pkg.classes {
                names.push(class.name.to_string());
                for method in &class.methods {
                    names.push(class.member_name(method));
                }
            }
            names.extend(pkg.functions.iter().map(|f| f.name.to_string()));
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate entries in package {}", pkg.alias);
        }
    }
}
