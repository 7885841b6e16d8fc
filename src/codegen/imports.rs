//! Import tracking for one generated module
//!
//! Imports are derived from the type expressions a module actually renders,
//! so the import block always matches the class body. All collections are
//! ordered; rendering is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::PythonVersion;
use crate::schema::DefinitionKind;

use super::names::module_name;
use super::types::{Scalar, TypeExpr, TypeRef};
use super::writer::CodeWriter;

#[derive(Debug)]
pub struct ImportTracker {
    /// Definition being generated; never imports itself
    owner: String,
    context: DefinitionKind,
    version: PythonVersion,
    /// module -> names, e.g. `pydantic` -> {BaseModel, Field}
    base: BTreeMap<String, BTreeSet<String>>,
    typing: BTreeSet<String>,
    datetime: BTreeSet<String>,
    /// name -> module, imported at module scope
    enums: BTreeMap<String, String>,
    /// name -> module, imported under `TYPE_CHECKING`
    guarded: BTreeMap<String, String>,
}

impl ImportTracker {
    pub fn new(owner: impl Into<String>, context: DefinitionKind, version: PythonVersion) -> Self {
        Self {
            owner: owner.into(),
            context,
            version,
            base: BTreeMap::new(),
            typing: BTreeSet::new(),
            datetime: BTreeSet::new(),
            enums: BTreeMap::new(),
            guarded: BTreeMap::new(),
        }
    }

    /// `from <module> import <name>`, rendered first
    pub fn add_base(&mut self, module: &str, name: &str) {
        self.base
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn add_typing(&mut self, name: &str) {
        self.typing.insert(name.to_string());
    }

    /// Record everything `expr` needs. Tracking the same expression twice is a no-op.
    pub fn track(&mut self, expr: &TypeExpr) {
        expr.walk(&mut |node| match node {
            TypeExpr::Scalar(Scalar::Any) => self.add_typing("Any"),
            TypeExpr::Scalar(Scalar::DateTime) => {
                self.datetime.insert("datetime".to_string());
            }
            TypeExpr::Scalar(Scalar::Date) => {
                self.datetime.insert("date".to_string());
            }
            TypeExpr::Scalar(_) => {}
            TypeExpr::Optional(_) => self.add_typing("Optional"),
            TypeExpr::Array(_) => {
                if !self.version.has_builtin_generics() {
                    self.add_typing("List");
                }
            }
            TypeExpr::Map(_) => {
                if !self.version.has_builtin_generics() {
                    self.add_typing("Dict");
                }
            }
            TypeExpr::Literal(_) => self.add_typing("Literal"),
            TypeExpr::Union(members) => {
                self.add_typing("Union");
                for member in members {
                    self.track_ref(member);
                }
            }
            TypeExpr::Reference(r) => self.track_ref(r),
        });
    }

    fn track_ref(&mut self, r: &TypeRef) {
        let Some(kind) = r.kind else {
            return;
        };
        if kind == self.context && r.name == self.owner {
            return;
        }
        let module = if kind == self.context {
            format!(".{}", module_name(&r.name))
        } else {
            format!("..{}.{}", kind.dir_name(), module_name(&r.name))
        };
        if kind == DefinitionKind::Enum {
            self.enums.insert(r.name.clone(), module);
        } else {
            self.guarded.insert(r.name.clone(), module);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
            && self.typing.is_empty()
            && self.datetime.is_empty()
            && self.enums.is_empty()
            && self.guarded.is_empty()
    }

    /// Write the import block
    pub fn render(&self, out: &mut CodeWriter) {
        for (module, names) in &self.base {
            out.line(format!("from {} import {}", module, join(names)));
        }

        let mut typing = self.typing.clone();
        if !self.guarded.is_empty() {
            typing.insert("TYPE_CHECKING".to_string());
        }
        if !typing.is_empty() {
            out.line(format!("from typing import {}", join(&typing)));
        }
        if !self.datetime.is_empty() {
            out.line(format!("from datetime import {}", join(&self.datetime)));
        }

        for (name, module) in &self.enums {
            out.line(format!("from {} import {}", module, name));
        }

        if !self.guarded.is_empty() {
            out.blank();
            out.line("if TYPE_CHECKING:");
            out.indent();
            for (name, module) in &self.guarded {
                out.line(format!("from {} import {}", module, name));
            }
            out.dedent();
        }
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
