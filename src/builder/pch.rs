//! Precompiled header builder.
//!
//! There is exactly one precompiled header per package, and every library
//! and test translation unit depends on it. How the header is produced and
//! consumed depends on the profile's [`PchStrategy`]:
//!
//! - `InlineCompile` (MSVC): the common translation unit is compiled with
//!   `/Yc`, producing its object and the `.pch` as a side effect. Consumers
//!   compile with `/Yu` and link the common object.
//! - `ExplicitArtifact` (GCC/Clang): the header is compiled by its own step
//!   into `build/pch/<header>.gch`, next to a copy of the header at
//!   `build/pch/<header>`. Consumers put `build/pch` first on the include
//!   path and force-include the header, so both the forced include and the
//!   sources' own `#include` resolve to the copy and pick up the artifact.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builder::graph::{Action, CompileStep, NodeId, PchStep, TaskGraphEngine};
use crate::core::platform::{PchStrategy, PlatformProfile};

/// Inputs of the precompiled-header node.
#[derive(Debug, Clone)]
pub struct PchInputs {
    /// Header as written in `#include` directives
    pub header: PathBuf,
    /// Header file on disk (`ExplicitArtifact`)
    pub header_file: PathBuf,
    /// Common translation unit on disk (`InlineCompile`)
    pub common_source: PathBuf,
    /// Object of the common translation unit (`InlineCompile`)
    pub common_object: PathBuf,
    /// Precompiled artifact
    pub output: PathBuf,
    /// Directory consumers search first for the artifact (`ExplicitArtifact`)
    pub output_dir: PathBuf,
    /// Include directories shared by every translation unit
    pub include_dirs: Vec<PathBuf>,
    /// Defines shared by every translation unit
    pub defines: BTreeMap<String, String>,
}

/// How translation units consume the precompiled header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchRule {
    /// Node every translation unit must depend on
    pub node: NodeId,
    /// Flags added to every consuming compile
    pub cxxflags: Vec<String>,
    /// Include directories placed before the shared ones
    pub include_dirs: Vec<PathBuf>,
    /// Objects every consuming link must include
    pub link_objects: Vec<PathBuf>,
}

impl PchRule {
    /// Apply the rule to a consuming compile step.
    pub fn apply(&self, step: &mut CompileStep) {
        let mut dirs = self.include_dirs.clone();
        dirs.append(&mut step.include_dirs);
        step.include_dirs = dirs;
        step.cxxflags.extend(self.cxxflags.iter().cloned());
    }
}

/// Declare the precompiled-header node and return the rule consumers follow.
///
/// The node has no prerequisites.
pub fn build_pch(
    engine: &mut dyn TaskGraphEngine,
    profile: &PlatformProfile,
    node_name: &str,
    inputs: &PchInputs,
) -> PchRule {
    let header = inputs.header.to_string_lossy().into_owned();

    match profile.pch {
        PchStrategy::InlineCompile => {
            let fp = format!("/Fp{}", inputs.output.display());
            let mut cxxflags = profile.cxxflags.clone();
            cxxflags.push(format!("/Yc{}", header));
            cxxflags.push(fp.clone());

            let node = engine.declare_artifact(
                node_name,
                Action::Compile(CompileStep {
                    source: inputs.common_source.clone(),
                    output: inputs.common_object.clone(),
                    include_dirs: inputs.include_dirs.clone(),
                    defines: inputs.defines.clone(),
                    cxxflags,
                }),
            );

            PchRule {
                node,
                cxxflags: vec![format!("/Yu{}", header), fp],
                include_dirs: Vec::new(),
                link_objects: vec![inputs.common_object.clone()],
            }
        }
        PchStrategy::ExplicitArtifact => {
            let mut include_dirs = inputs.include_dirs.clone();
            if let Some(dir) = inputs.header_file.parent() {
                include_dirs.push(dir.to_path_buf());
            }

            let node = engine.declare_artifact(
                node_name,
                Action::CompilePch(PchStep {
                    header: inputs.header_file.clone(),
                    staged_header: inputs.output_dir.join(&inputs.header),
                    output: inputs.output.clone(),
                    include_dirs,
                    defines: inputs.defines.clone(),
                    cxxflags: profile.cxxflags.clone(),
                }),
            );

            PchRule {
                node,
                cxxflags: vec!["-include".to_string(), header],
                include_dirs: vec![inputs.output_dir.clone()],
                link_objects: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::graph::TaskGraph;

    fn inputs() -> PchInputs {
        PchInputs {
            header: PathBuf::from("demo/Common.hpp"),
            header_file: PathBuf::from("/p/include/demo/Common.hpp"),
            common_source: PathBuf::from("/p/src/Common.cpp"),
            common_object: PathBuf::from("/p/build/src/Common.obj"),
            output: PathBuf::from("/p/build/pch/demo/Common.hpp.gch"),
            output_dir: PathBuf::from("/p/build/pch"),
            include_dirs: vec![PathBuf::from("/p/include")],
            defines: BTreeMap::from([("VERSION".to_string(), "1.0.0".to_string())]),
        }
    }

    fn consumer() -> CompileStep {
        CompileStep {
            source: PathBuf::from("/p/src/a.cpp"),
            output: PathBuf::from("/p/build/src/a.o"),
            include_dirs: vec![PathBuf::from("/p/include")],
            defines: BTreeMap::new(),
            cxxflags: vec!["-g".to_string()],
        }
    }

    #[test]
    fn test_inline_compile() {
        let mut graph = TaskGraph::new(Vec::<String>::new());
        let rule = build_pch(&mut graph, &PlatformProfile::windows(), "build/src/Common.obj", &inputs());

        assert_eq!(graph.in_degree(rule.node), 0);
        match &graph.node(rule.node).action {
            Action::Compile(step) => {
                assert_eq!(step.source, PathBuf::from("/p/src/Common.cpp"));
                assert!(step.cxxflags.contains(&"/Ycdemo/Common.hpp".to_string()));
                assert!(step.cxxflags.iter().any(|f| f.starts_with("/Fp")));
                assert!(step.cxxflags.contains(&"/EHsc".to_string()));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert!(rule.cxxflags.contains(&"/Yudemo/Common.hpp".to_string()));
        assert_eq!(rule.link_objects, vec![PathBuf::from("/p/build/src/Common.obj")]);
    }

    #[test]
    fn test_explicit_artifact() {
        let mut graph = TaskGraph::new(Vec::<String>::new());
        let rule = build_pch(
            &mut graph,
            &PlatformProfile::unix("linux"),
            "build/pch/demo/Common.hpp.gch",
            &inputs(),
        );

        assert_eq!(graph.in_degree(rule.node), 0);
        match &graph.node(rule.node).action {
            Action::CompilePch(step) => {
                assert_eq!(step.header, PathBuf::from("/p/include/demo/Common.hpp"));
                assert_eq!(
                    step.staged_header,
                    PathBuf::from("/p/build/pch/demo/Common.hpp")
                );
                assert_eq!(step.staged_header.parent(), step.output.parent());
                assert_eq!(
                    step.include_dirs.last(),
                    Some(&PathBuf::from("/p/include/demo"))
                );
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert!(rule.link_objects.is_empty());

        let mut step = consumer();
        rule.apply(&mut step);
        assert_eq!(
            step.include_dirs,
            vec![PathBuf::from("/p/build/pch"), PathBuf::from("/p/include")]
        );
        assert_eq!(step.cxxflags, vec!["-g", "-include", "demo/Common.hpp"]);
    }
}
