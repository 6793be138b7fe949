//! Cross-module symbol lookup: following IMPORTS to find which module an
//! unqualified reference actually lives in.

use std::collections::HashMap;

use crate::ast::{Assignment, RawModule};
use crate::error::ResolveError;

pub struct SymbolTable<'a> {
    modules: HashMap<&'a str, &'a RawModule>,
}

impl<'a> SymbolTable<'a> {
    pub fn new(modules: &'a [RawModule]) -> Self {
        let mut map = HashMap::with_capacity(modules.len());
        for m in modules {
            map.insert(m.name.as_str(), m);
        }
        Self { modules: map }
    }

    pub fn module(&self, name: &str) -> Option<&'a RawModule> {
        self.modules.get(name).copied()
    }

    /// Resolves `name` as seen from `from_module`, following one level of
    /// IMPORTS if the symbol is not defined locally. Re-exported symbols
    /// (a module that imports a name and is itself imported from) are
    /// resolved transitively by repeating the lookup against the module
    /// that supplied it.
    pub fn resolve_assignment(
        &self,
        from_module: &str,
        name: &str,
    ) -> Result<(&'a str, &'a Assignment), ResolveError> {
        let mut current = from_module;
        let mut seen = Vec::new();
        loop {
            let module = self.module(current).ok_or_else(|| ResolveError::UnknownReference {
                module: from_module.to_string(),
                name: name.to_string(),
            })?;
            if let Some(a) = module.assignments.iter().find(|a| a.name == name) {
                return Ok((current, a));
            }
            let import = module
                .imports
                .iter()
                .find(|imp| imp.symbols.iter().any(|s| s == name));
            match import {
                Some(imp) => {
                    if seen.contains(&current) {
                        return Err(ResolveError::UnknownReference {
                            module: from_module.to_string(),
                            name: name.to_string(),
                        });
                    }
                    seen.push(current);
                    current = imp.module.as_str();
                }
                None => {
                    return Err(ResolveError::UnknownReference {
                        module: from_module.to_string(),
                        name: name.to_string(),
                    })
                }
            }
        }
    }
}
