//! Task graph.
//!
//! The build plan is a directed acyclic graph of nodes. An edge runs from a
//! prerequisite to its dependent: the prerequisite must complete before the
//! dependent starts. Nodes are declared during configuration and never
//! mutated afterwards.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;

/// Handle to a node of a [`TaskGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NodeIndex);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// Compile one translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileStep {
    /// Source file
    pub source: PathBuf,
    /// Output object file
    pub output: PathBuf,
    /// Include directories, in search order
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor defines
    pub defines: BTreeMap<String, String>,
    /// Compiler flags, including the precompiled-header flags
    pub cxxflags: Vec<String>,
}

impl CompileStep {
    /// Get the precompiled header this compile creates (`/Yc` with `/Fp`).
    pub fn created_pch(&self) -> Option<PathBuf> {
        if !self.cxxflags.iter().any(|f| f.starts_with("/Yc")) {
            return None;
        }
        self.cxxflags
            .iter()
            .find_map(|f| f.strip_prefix("/Fp"))
            .map(PathBuf::from)
    }
}

/// Compile a header into a standalone precompiled-header artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PchStep {
    /// Header file on disk
    pub header: PathBuf,
    /// Copy of the header placed beside the output; compilers only use the
    /// artifact when the header it was built from sits next to it
    pub staged_header: PathBuf,
    /// Output artifact
    pub output: PathBuf,
    /// Include directories, in search order
    pub include_dirs: Vec<PathBuf>,
    /// Preprocessor defines
    pub defines: BTreeMap<String, String>,
    /// Compiler flags
    pub cxxflags: Vec<String>,
}

/// Create a static library from objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStep {
    /// Object files to archive
    pub objects: Vec<PathBuf>,
    /// Output library
    pub output: PathBuf,
}

/// What a link step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    SharedLib,
    Executable,
}

/// Link objects into a shared library or executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStep {
    /// Shared library or executable
    pub kind: LinkKind,
    /// Object files and libraries linked by path
    pub objects: Vec<PathBuf>,
    /// Output file
    pub output: PathBuf,
    /// Library search paths
    pub lib_dirs: Vec<PathBuf>,
    /// Libraries linked by name
    pub libs: Vec<String>,
    /// Frameworks
    pub frameworks: Vec<String>,
    /// Linker flags
    pub ldflags: Vec<String>,
}

/// Compile and link one standalone test program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBuildStep {
    /// Test name
    pub name: String,
    /// Compilation of the test source
    pub compile: CompileStep,
    /// Link of the test program
    pub link: LinkStep,
}

/// Run a test program and record its exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTestStep {
    /// Test name
    pub name: String,
    /// Test program
    pub executable: PathBuf,
}

/// The work a node performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    CompilePch(PchStep),
    Compile(CompileStep),
    Archive(ArchiveStep),
    Link(LinkStep),
    BuildTest(TestBuildStep),
    RunTest(RunTestStep),
    /// No work of its own; succeeds when all prerequisites succeed.
    Alias,
}

impl Action {
    /// Short name of the action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CompilePch(_) => "compile-pch",
            Action::Compile(_) => "compile",
            Action::Archive(_) => "archive",
            Action::Link(_) => "link",
            Action::BuildTest(_) => "build-test",
            Action::RunTest(_) => "run-test",
            Action::Alias => "alias",
        }
    }

    /// Files this action reads that are not produced by other nodes.
    pub fn file_inputs(&self) -> Vec<PathBuf> {
        match self {
            Action::CompilePch(s) => vec![s.header.clone()],
            Action::Compile(s) => vec![s.source.clone()],
            Action::BuildTest(s) => vec![s.compile.source.clone()],
            _ => Vec::new(),
        }
    }

    /// Files this action writes.
    pub fn outputs(&self) -> Vec<PathBuf> {
        match self {
            Action::CompilePch(s) => vec![s.staged_header.clone(), s.output.clone()],
            Action::Compile(s) => {
                let mut outputs = vec![s.output.clone()];
                outputs.extend(s.created_pch());
                outputs
            }
            Action::Archive(s) => vec![s.output.clone()],
            Action::Link(s) => vec![s.output.clone()],
            Action::BuildTest(s) => vec![s.compile.output.clone(), s.link.output.clone()],
            Action::RunTest(_) | Action::Alias => Vec::new(),
        }
    }
}

/// A declared unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node name
    pub name: String,
    /// Work performed by the node
    pub action: Action,
}

/// The capability the build plan assembler needs from a task-graph engine.
pub trait TaskGraphEngine {
    /// Declare a node. Names must be unique within the graph.
    fn declare_artifact(&mut self, name: &str, action: Action) -> NodeId;

    /// Declare that `dependent` must not start before `prerequisite` completes.
    fn declare_dependency(&mut self, dependent: NodeId, prerequisite: NodeId);

    /// Make `node` reachable from the command line as `alias`.
    fn declare_alias(&mut self, alias: &str, node: NodeId);

    /// Build `node` when no target is named on the command line.
    fn declare_default(&mut self, node: NodeId);

    /// Check if `target` was named on the command line.
    fn is_target_requested(&self, target: &str) -> bool;
}

/// A task graph backed by petgraph.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    graph: DiGraph<Node, ()>,
    by_name: HashMap<String, NodeIndex>,
    aliases: BTreeMap<String, NodeId>,
    defaults: Vec<NodeId>,
    requested: Vec<String>,
}

impl TaskGraph {
    /// Create an empty graph for the given command-line targets.
    pub fn new<I, S>(requested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TaskGraph {
            requested: requested.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id.0]
    }

    /// Find a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).map(|&ix| NodeId(ix))
    }

    /// Iterate over all node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(NodeId)
    }

    /// Get the nodes whose action has the given kind.
    pub fn nodes_of_kind(&self, kind: &str) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| self.node(id).action.kind() == kind)
            .collect()
    }

    /// Get the direct prerequisites of a node.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let mut deps: Vec<NodeId> = self
            .graph
            .neighbors_directed(id.0, Direction::Incoming)
            .map(NodeId)
            .collect();
        deps.sort();
        deps
    }

    /// Get the direct dependents of a node.
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        let mut deps: Vec<NodeId> = self
            .graph
            .neighbors_directed(id.0, Direction::Outgoing)
            .map(NodeId)
            .collect();
        deps.sort();
        deps
    }

    /// Get the number of direct prerequisites.
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.graph
            .neighbors_directed(id.0, Direction::Incoming)
            .count()
    }

    /// Get every transitive prerequisite of a node.
    pub fn ancestors(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<NodeId> = self.dependencies(id).into();

        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                queue.extend(self.dependencies(next));
            }
        }

        seen
    }

    /// Check if `ancestor` must complete before `id`.
    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Get every transitive dependent of a node.
    pub fn descendants(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<NodeId> = self.dependents(id).into();

        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                queue.extend(self.dependents(next));
            }
        }

        seen
    }

    /// Get all nodes ordered so prerequisites come first.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, BuildError> {
        petgraph::algo::toposort(&self.graph, None)
            .map(|order| order.into_iter().map(NodeId).collect())
            .map_err(|cycle| {
                BuildError::config(format!(
                    "dependency cycle through `{}`",
                    self.graph[cycle.node_id()].name
                ))
            })
    }

    /// Get the node registered under an alias.
    pub fn alias(&self, alias: &str) -> Option<NodeId> {
        self.aliases.get(alias).copied()
    }

    /// Get the default goals.
    pub fn defaults(&self) -> &[NodeId] {
        &self.defaults
    }

    /// Map the requested targets to goal nodes.
    ///
    /// With no targets the defaults are built. A target is an alias or a
    /// node name; anything else is a configuration error.
    pub fn goals(&self) -> Result<Vec<NodeId>, BuildError> {
        if self.requested.is_empty() {
            return Ok(self.defaults.clone());
        }

        let mut goals = Vec::new();
        for target in &self.requested {
            let id = self
                .alias(target)
                .or_else(|| self.find(target))
                .ok_or_else(|| {
                    let known: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
                    BuildError::config(format!(
                        "no such target `{}` (aliases: {})",
                        target,
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    ))
                })?;
            if !goals.contains(&id) {
                goals.push(id);
            }
        }
        Ok(goals)
    }

    /// Describe the graph for machine-readable output.
    pub fn describe(&self) -> GraphDescription {
        let nodes = self
            .node_ids()
            .map(|id| {
                let node = self.node(id);
                NodeDescription {
                    name: node.name.clone(),
                    action: node.action.clone(),
                    dependencies: self
                        .dependencies(id)
                        .into_iter()
                        .map(|d| self.node(d).name.clone())
                        .collect(),
                }
            })
            .collect();

        GraphDescription {
            nodes,
            aliases: self
                .aliases
                .iter()
                .map(|(k, v)| (k.clone(), self.node(*v).name.clone()))
                .collect(),
            defaults: self
                .defaults
                .iter()
                .map(|id| self.node(*id).name.clone())
                .collect(),
        }
    }
}

impl TaskGraphEngine for TaskGraph {
    fn declare_artifact(&mut self, name: &str, action: Action) -> NodeId {
        debug_assert!(
            !self.by_name.contains_key(name),
            "node `{}` declared twice",
            name
        );

        let ix = self.graph.add_node(Node {
            name: name.to_string(),
            action,
        });
        self.by_name.insert(name.to_string(), ix);
        tracing::trace!("declared node `{}`", name);
        NodeId(ix)
    }

    fn declare_dependency(&mut self, dependent: NodeId, prerequisite: NodeId) {
        if !self.graph.contains_edge(prerequisite.0, dependent.0) {
            self.graph.add_edge(prerequisite.0, dependent.0, ());
        }
    }

    fn declare_alias(&mut self, alias: &str, node: NodeId) {
        self.aliases.insert(alias.to_string(), node);
    }

    fn declare_default(&mut self, node: NodeId) {
        if !self.defaults.contains(&node) {
            self.defaults.push(node);
        }
    }

    fn is_target_requested(&self, target: &str) -> bool {
        self.requested.iter().any(|t| t == target)
    }
}

/// Serializable view of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDescription {
    pub nodes: Vec<NodeDescription>,
    pub aliases: BTreeMap<String, String>,
    pub defaults: Vec<String>,
}

/// Serializable view of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    pub action: Action,
    pub dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(name: &str) -> Action {
        Action::Archive(ArchiveStep {
            objects: vec![],
            output: PathBuf::from(name),
        })
    }

    #[test]
    fn test_declare_and_query() {
        let mut g = TaskGraph::new(Vec::<String>::new());
        let a = g.declare_artifact("a", archive("a"));
        let b = g.declare_artifact("b", archive("b"));
        let c = g.declare_artifact("c", Action::Alias);
        g.declare_dependency(b, a);
        g.declare_dependency(c, b);
        g.declare_dependency(c, b);

        assert_eq!(g.len(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.in_degree(a), 0);
        assert_eq!(g.dependencies(c), vec![b]);
        assert_eq!(g.dependents(a), vec![b]);
        assert!(g.has_ancestor(c, a));
        assert!(!g.has_ancestor(a, c));
        assert_eq!(g.descendants(a).len(), 2);
        assert_eq!(g.find("b"), Some(b));
        assert_eq!(g.nodes_of_kind("alias"), vec![c]);
    }

    #[test]
    fn test_topological_order() {
        let mut g = TaskGraph::new(Vec::<String>::new());
        let link = g.declare_artifact("link", archive("lib"));
        let x = g.declare_artifact("x", archive("x"));
        let y = g.declare_artifact("y", archive("y"));
        g.declare_dependency(link, x);
        g.declare_dependency(link, y);
        g.declare_dependency(y, x);

        let order = g.topological_order().unwrap();
        let pos = |id| order.iter().position(|&n| n == id).unwrap();
        assert!(pos(x) < pos(y));
        assert!(pos(y) < pos(link));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut g = TaskGraph::new(Vec::<String>::new());
        let a = g.declare_artifact("a", Action::Alias);
        let b = g.declare_artifact("b", Action::Alias);
        g.declare_dependency(a, b);
        g.declare_dependency(b, a);
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn test_goals() {
        let mut g = TaskGraph::new(["check"]);
        let lib = g.declare_artifact("lib/libdemo.so", archive("lib"));
        let check = g.declare_artifact("check", Action::Alias);
        g.declare_default(lib);
        g.declare_alias("check", check);

        assert!(g.is_target_requested("check"));
        assert!(!g.is_target_requested("lib"));
        assert_eq!(g.goals().unwrap(), vec![check]);

        let mut g2 = TaskGraph::new(Vec::<String>::new());
        let lib2 = g2.declare_artifact("lib/libdemo.so", archive("lib"));
        g2.declare_default(lib2);
        assert_eq!(g2.goals().unwrap(), vec![lib2]);

        let mut g3 = TaskGraph::new(["lib/libdemo.so", "nope"]);
        g3.declare_artifact("lib/libdemo.so", archive("lib"));
        let err = g3.goals().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_describe_serializes() {
        let mut g = TaskGraph::new(Vec::<String>::new());
        let a = g.declare_artifact("a.o", archive("a.o"));
        let lib = g.declare_artifact("lib.a", archive("lib.a"));
        g.declare_dependency(lib, a);
        g.declare_default(lib);

        let json = serde_json::to_string(&g.describe()).unwrap();
        assert!(json.contains("\"type\":\"archive\""));
        assert!(json.contains("\"dependencies\":[\"a.o\"]"));
        assert!(json.contains("\"defaults\":[\"lib.a\"]"));
    }

    #[test]
    fn test_action_outputs() {
        let step = TestBuildStep {
            name: "t".to_string(),
            compile: CompileStep {
                source: PathBuf::from("test/t.cpp"),
                output: PathBuf::from("build/test/t.o"),
                include_dirs: vec![],
                defines: BTreeMap::new(),
                cxxflags: vec![],
            },
            link: LinkStep {
                kind: LinkKind::Executable,
                objects: vec![PathBuf::from("build/test/t.o")],
                output: PathBuf::from("bin/test/t"),
                lib_dirs: vec![],
                libs: vec![],
                frameworks: vec![],
                ldflags: vec![],
            },
        };
        let action = Action::BuildTest(step);
        assert_eq!(action.file_inputs(), vec![PathBuf::from("test/t.cpp")]);
        assert_eq!(action.outputs().len(), 2);
        assert!(Action::Alias.outputs().is_empty());
    }

    #[test]
    fn test_inline_pch_compile_outputs() {
        let step = |flags: &[&str]| CompileStep {
            source: PathBuf::from("src/Common.cpp"),
            output: PathBuf::from("build/src/Common.obj"),
            include_dirs: vec![],
            defines: BTreeMap::new(),
            cxxflags: flags.iter().map(|f| f.to_string()).collect(),
        };

        let create = Action::Compile(step(&["/EHsc", "/YcCommon.hpp", "/Fpbuild/pch/demo.pch"]));
        assert_eq!(
            create.outputs(),
            vec![
                PathBuf::from("build/src/Common.obj"),
                PathBuf::from("build/pch/demo.pch")
            ]
        );

        let consume = Action::Compile(step(&["/YuCommon.hpp", "/Fpbuild/pch/demo.pch"]));
        assert_eq!(consume.outputs(), vec![PathBuf::from("build/src/Common.obj")]);
    }
}
