use cargo_metadata::{DependencyKind, MetadataCommand};
use std::collections::{BTreeMap, BTreeSet};

/// Normal dependencies each treeaudit crate may take on its siblings.
/// core <- scan <- report <- cli
fn layers() -> BTreeMap<&'static str, BTreeSet<&'static str>> {
    let mut map = BTreeMap::new();
    map.insert("treeaudit-core", BTreeSet::new());
    map.insert("treeaudit-scan", set(["treeaudit-core"]));
    map.insert("treeaudit-report", set(["treeaudit-core", "treeaudit-scan"]));
    map.insert(
        "treeaudit-cli",
        set(["treeaudit-core", "treeaudit-scan", "treeaudit-report"]),
    );
    map
}

fn main() {
    let metadata = match MetadataCommand::new().exec() {
        Ok(metadata) => metadata,
        Err(err) => {
            eprintln!("boundary-check: failed to read cargo metadata: {err}");
            std::process::exit(2);
        }
    };

    let members: BTreeSet<_> = metadata.workspace_members.iter().collect();
    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let names: BTreeSet<String> = metadata
        .packages
        .iter()
        .filter(|pkg| members.contains(&pkg.id))
        .map(|pkg| pkg.name.to_string())
        .collect();
    for pkg in metadata.packages.iter().filter(|pkg| members.contains(&pkg.id)) {
        let internal = pkg
            .dependencies
            .iter()
            .filter(|dep| dep.kind == DependencyKind::Normal)
            .filter(|dep| names.contains(dep.name.as_str()))
            .map(|dep| dep.name.clone())
            .collect();
        graph.insert(pkg.name.to_string(), internal);
    }

    let violations = check(&graph, &layers());
    if violations.is_empty() {
        println!("boundary-check: ok ({} crates)", graph.len());
        return;
    }
    eprintln!("boundary-check: layering violations:");
    for item in violations {
        eprintln!("  {item}");
    }
    std::process::exit(1);
}

fn check(
    graph: &BTreeMap<String, Vec<String>>,
    layers: &BTreeMap<&'static str, BTreeSet<&'static str>>,
) -> Vec<String> {
    let mut violations = Vec::new();
    for (name, deps) in graph {
        if name == "boundary-check" {
            continue;
        }
        let Some(allowed) = layers.get(name.as_str()) else {
            violations.push(format!("{name} has no declared layer"));
            continue;
        };
        for dep in deps {
            if !allowed.contains(dep.as_str()) {
                violations.push(format!("{name} -> {dep}"));
            }
        }
    }
    violations
}

fn set<const N: usize>(items: [&'static str; N]) -> BTreeSet<&'static str> {
    items.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(name, deps)| {
                (
                    name.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn layered_graph_passes() {
        let g = graph(&[
            ("treeaudit-core", &[]),
            ("treeaudit-scan", &["treeaudit-core"]),
            ("treeaudit-report", &["treeaudit-core", "treeaudit-scan"]),
            ("boundary-check", &[]),
        ]);
        assert!(check(&g, &layers()).is_empty());
    }

    #[test]
    fn upward_edge_and_unknown_crate_are_flagged() {
        let g = graph(&[
            ("treeaudit-scan", &["treeaudit-report"]),
            ("treeaudit-extra", &[]),
        ]);
        let violations = check(&g, &layers());
        assert!(violations.contains(&"treeaudit-scan -> treeaudit-report".to_string()));
        assert!(violations.contains(&"treeaudit-extra has no declared layer".to_string()));
    }
}
