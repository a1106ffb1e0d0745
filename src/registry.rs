//! Module registry and cross-file reference resolver. Built once in the
//! reduce phase from the per-module indexes; read-only afterwards. The
//! graph is two flat tables keyed by input slot: which module answers a
//! dotted import path, and which names each module is referenced by from
//! the rest of the analysis set.

use crate::semantic::model::{ImportTarget, ModuleIndex};
use log::warn;
use std::collections::{BTreeSet, HashMap};

/// Derive the dotted module name from a source path:
/// `pkg/util/io.py` → `pkg.util.io`, `pkg/__init__.py` → `pkg`.
pub fn module_dotted_name(path: &str) -> String {
    let trimmed = path.strip_suffix(".py").unwrap_or(path);
    let parts: Vec<&str> = trimmed
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let dotted = parts.join(".");
    match dotted.strip_suffix(".__init__") {
        Some(package) => package.to_string(),
        None if dotted == "__init__" => String::new(),
        None => dotted,
    }
}

pub struct RegistryInput<'a> {
    /// Position in the caller-provided module list.
    pub slot: usize,
    pub dotted: &'a str,
    pub is_package: bool,
    pub index: &'a ModuleIndex,
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    by_name: HashMap<String, usize>,
    external_uses: Vec<BTreeSet<String>>,
    star_imported: Vec<bool>,
}

impl ModuleRegistry {
    pub fn build(
        total_slots: usize,
        inputs: &[RegistryInput<'_>],
        treat_star_import_as_opaque: bool,
    ) -> Self {
        let mut registry = ModuleRegistry {
            by_name: HashMap::with_capacity(inputs.len()),
            external_uses: (0..total_slots).map(|_| BTreeSet::new()).collect(),
            star_imported: vec![false; total_slots],
        };
        for input in inputs {
            if let Some(&existing) = registry.by_name.get(input.dotted) {
                warn!(
                    "duplicate module name {} (slots {} and {}); first wins",
                    input.dotted, existing, input.slot
                );
                continue;
            }
            registry.by_name.insert(input.dotted.to_string(), input.slot);
        }

        for input in inputs {
            for record in &input.index.imports {
                match &record.target {
                    ImportTarget::Module { dotted } => {
                        if let Some(target) = registry.lookup_other(dotted, input.slot) {
                            registry.credit_attribute_uses(input.index, record.binding, target);
                        }
                    }
                    ImportTarget::Symbol {
                        level,
                        module,
                        name,
                    } => {
                        let Some(base) = resolve_import_base(
                            input.dotted,
                            input.is_package,
                            *level,
                            module.as_deref(),
                        ) else {
                            continue;
                        };
                        if let Some(target) = registry.lookup_other(&base, input.slot) {
                            registry.external_uses[target].insert(name.clone());
                        }
                        // `from pkg import mod` may name a sibling module
                        let submodule = if base.is_empty() {
                            name.clone()
                        } else {
                            format!("{base}.{name}")
                        };
                        if let Some(target) = registry.lookup_other(&submodule, input.slot) {
                            registry.credit_attribute_uses(input.index, record.binding, target);
                        }
                    }
                    ImportTarget::Star { level, module } => {
                        if !treat_star_import_as_opaque {
                            continue;
                        }
                        let Some(base) = resolve_import_base(
                            input.dotted,
                            input.is_package,
                            *level,
                            module.as_deref(),
                        ) else {
                            continue;
                        };
                        if let Some(target) = registry.lookup_other(&base, input.slot) {
                            registry.star_imported[target] = true;
                        }
                    }
                }
            }
        }
        registry
    }

    fn lookup_other(&self, dotted: &str, slot: usize) -> Option<usize> {
        match self.by_name.get(dotted) {
            Some(&target) if target != slot => Some(target),
            _ => None,
        }
    }

    /// `import m; m.n`: statically decidable attribute accesses count as
    /// references to `n` inside the target module.
    fn credit_attribute_uses(
        &mut self,
        index: &ModuleIndex,
        binding: Option<usize>,
        target: usize,
    ) {
        let Some(binding) = binding else { return };
        for use_site in &index.binding(binding).use_sites {
            if let Some(attr) = &use_site.attr {
                self.external_uses[target].insert(attr.clone());
            }
        }
    }

    pub fn slot_of(&self, dotted: &str) -> Option<usize> {
        self.by_name.get(dotted).copied()
    }

    /// Whether another analyzed module references `name` from this module.
    pub fn externally_used(&self, slot: usize, name: &str) -> bool {
        self.external_uses
            .get(slot)
            .is_some_and(|names| names.contains(name))
    }

    /// Whether another analyzed module star-imports this module.
    pub fn star_imported(&self, slot: usize) -> bool {
        self.star_imported.get(slot).copied().unwrap_or(false)
    }
}

/// Resolve the module an import refers to. `level` 0 is absolute; a
/// relative import climbs `level` packages from the importing module
/// (one less when the importer is itself a package).
fn resolve_import_base(
    importer: &str,
    is_package: bool,
    level: u32,
    module: Option<&str>,
) -> Option<String> {
    if level == 0 {
        return module.map(str::to_string);
    }
    let parts: Vec<&str> = importer.split('.').filter(|p| !p.is_empty()).collect();
    let climb = (level as usize).checked_sub(if is_package { 1 } else { 0 })?;
    if climb > parts.len() {
        return None;
    }
    let mut base: Vec<&str> = parts[..parts.len() - climb].to_vec();
    if let Some(module) = module {
        base.extend(module.split('.'));
    }
    Some(base.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::builder::build_module_index;
    use ruff_python_ast::PySourceType;

    fn index_of(source: &str) -> ModuleIndex {
        let parsed =
            ruff_python_parser::parse_unchecked_source(source, PySourceType::Python);
        build_module_index(parsed.suite(), 12)
    }

    #[test]
    fn dotted_names() {
        assert_eq!(module_dotted_name("pkg/util/io.py"), "pkg.util.io");
        assert_eq!(module_dotted_name("pkg/__init__.py"), "pkg");
        assert_eq!(module_dotted_name("single.py"), "single");
        assert_eq!(module_dotted_name("./a/b.py"), "a.b");
    }

    #[test]
    fn relative_import_bases() {
        assert_eq!(
            resolve_import_base("pkg.mod", false, 1, Some("sibling")),
            Some("pkg.sibling".to_string())
        );
        assert_eq!(
            resolve_import_base("anchor", false, 1, Some("other")),
            Some("other".to_string())
        );
        assert_eq!(
            resolve_import_base("pkg", true, 1, Some("mod")),
            Some("pkg.mod".to_string())
        );
        assert_eq!(resolve_import_base("a", false, 3, Some("x")), None);
        assert_eq!(
            resolve_import_base("any", false, 0, Some("os.path")),
            Some("os.path".to_string())
        );
    }

    #[test]
    fn from_import_records_external_use() {
        let anchor = index_of("def exported():\n    return 1\n");
        let user = index_of("from anchor import exported\nexported()\n");
        let inputs = [
            RegistryInput {
                slot: 0,
                dotted: "anchor",
                is_package: false,
                index: &anchor,
            },
            RegistryInput {
                slot: 1,
                dotted: "user",
                is_package: false,
                index: &user,
            },
        ];
        let registry = ModuleRegistry::build(2, &inputs, true);
        assert!(registry.externally_used(0, "exported"));
        assert!(!registry.externally_used(0, "missing"));
    }

    #[test]
    fn attribute_access_records_external_use() {
        let anchor = index_of("def helper():\n    return 1\n");
        let user = index_of("import anchor\nanchor.helper()\n");
        let inputs = [
            RegistryInput {
                slot: 0,
                dotted: "anchor",
                is_package: false,
                index: &anchor,
            },
            RegistryInput {
                slot: 1,
                dotted: "user",
                is_package: false,
                index: &user,
            },
        ];
        let registry = ModuleRegistry::build(2, &inputs, true);
        assert!(registry.externally_used(0, "helper"));
    }

    #[test]
    fn star_import_marks_target() {
        let anchor = index_of("def anything():\n    return 1\n");
        let user = index_of("from anchor import *\n");
        let inputs = [
            RegistryInput {
                slot: 0,
                dotted: "anchor",
                is_package: false,
                index: &anchor,
            },
            RegistryInput {
                slot: 1,
                dotted: "user",
                is_package: false,
                index: &user,
            },
        ];
        let registry = ModuleRegistry::build(2, &inputs, true);
        assert!(registry.star_imported(0));

        let registry = ModuleRegistry::build(2, &inputs, false);
        assert!(!registry.star_imported(0));
    }

    #[test]
    fn imports_outside_the_set_are_external() {
        let user = index_of("import os\nos.getcwd()\n");
        let inputs = [RegistryInput {
            slot: 0,
            dotted: "user",
            is_package: false,
            index: &user,
        }];
        let registry = ModuleRegistry::build(1, &inputs, true);
        assert!(registry.slot_of("os").is_none());
        assert!(!registry.externally_used(0, "getcwd"));
    }
}
