//! Shared test support utilities.
//!
//! Provides the fixture catalog every discovery test resolves against, plus
//! helpers for running discovery and building fixture identifiers.

#![allow(dead_code)]

use sift_core::config::EngineConfig;
use sift_core::error::DiscoveryError;
use sift_core::identifier::{segment_type, Identifier};
use sift_core::inspector::CatalogInspector;
use sift_core::report::DiscoveryReport;
use sift_core::resolve::EngineDiscoveryResolver;
use sift_core::selector::{DiscoveryRequest, Selector};
use sift_core::tree::{NodeId, TestTree};

/// Grouping path of the main fixtures.
pub const PKG: &str = "org.sift.fixtures";

/// Fixture catalog: containers mirroring a typical test suite layout.
pub const CATALOG: &str = r#"{
  "known_types": ["java.lang.String"],
  "containers": [
    { "name": "org.sift.fixtures.NonTestClass", "grouping_path": "org.sift.fixtures", "root": "build/classes" },
    {
      "name": "org.sift.fixtures.AbstractTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "abstract": true,
      "members": [{ "name": "test" }]
    },
    {
      "name": "org.sift.fixtures.MyTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "source": { "file": "fixtures/MyTestClass.java", "line": 3, "col": 1 },
      "members": [
        { "name": "test1" },
        { "name": "test2" },
        { "name": "notATest", "kind": "plain" },
        { "name": "dynamicTest", "kind": "factory" }
      ]
    },
    {
      "name": "org.sift.fixtures.YourTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "members": [{ "name": "test3" }, { "name": "test4" }]
    },
    {
      "name": "org.sift.fixtures.HerTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "super_container": "org.sift.fixtures.MyTestClass",
      "members": [{ "name": "test7", "parameter_types": ["java.lang.String"] }]
    },
    { "name": "org.sift.fixtures.OtherTestClass", "grouping_path": "org.sift.fixtures", "root": "build/classes" },
    {
      "name": "org.sift.fixtures.OtherTestClass$NestedTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "members": [{ "name": "test5" }, { "name": "test6" }]
    },
    {
      "name": "org.sift.fixtures.TestCaseWithNesting",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "members": [{ "name": "testA" }]
    },
    {
      "name": "org.sift.fixtures.TestCaseWithNesting$NestedTestCase",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "enclosing": "org.sift.fixtures.TestCaseWithNesting",
      "members": [{ "name": "testB" }]
    },
    {
      "name": "org.sift.fixtures.TestCaseWithNesting$NestedTestCase$DoubleNestedTestCase",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "enclosing": "org.sift.fixtures.TestCaseWithNesting$NestedTestCase",
      "members": [{ "name": "testC" }]
    },
    {
      "name": "org.sift.fixtures.TestClassWithTemplate",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "members": [{ "name": "testTemplate", "kind": "template" }]
    },
    {
      "name": "org.sift.fixtures.ParallelTestClass",
      "grouping_path": "org.sift.fixtures",
      "root": "build/classes",
      "markers": {
        "display_name": "Parallel suite",
        "tags": ["fast", "bad tag", "fast", "db"],
        "execution_mode": "same_thread",
        "child_execution_mode": "concurrent",
        "resource_locks": [{ "key": "db", "mode": "read" }]
      },
      "members": [
        { "name": "inherits" },
        {
          "name": "isolated",
          "markers": {
            "execution_mode": "same_thread",
            "resource_locks": [{ "key": "db" }, { "key": "fs", "mode": "read" }]
          }
        }
      ]
    },
    {
      "name": "org.sift.fixtures.other.Class1WithTestCases",
      "grouping_path": "org.sift.fixtures.other",
      "root": "build/other",
      "members": [{ "name": "test1" }]
    },
    {
      "name": "org.sift.fixtures.other.Class2WithTestCases",
      "grouping_path": "org.sift.fixtures.other",
      "root": "build/other",
      "members": [{ "name": "test2" }]
    },
    {
      "name": "org.sift.fixtures.other.deep.Class3WithTestCases",
      "grouping_path": "org.sift.fixtures.other.deep",
      "root": "build/other",
      "members": [{ "name": "test3" }]
    },
    {
      "name": "org.sift.fixtures.otherwise.LookalikeTestCases",
      "grouping_path": "org.sift.fixtures.otherwise",
      "root": "build/other",
      "members": [{ "name": "test" }]
    }
  ]
}"#;

pub fn catalog() -> CatalogInspector {
    CatalogInspector::from_json(CATALOG).expect("fixture catalog parses")
}

/// Run discovery against the fixture catalog with the default config.
pub fn discover(selectors: impl IntoIterator<Item = Selector>) -> (TestTree, DiscoveryReport) {
    discover_request(&DiscoveryRequest::of(selectors))
}

pub fn discover_request(request: &DiscoveryRequest) -> (TestTree, DiscoveryReport) {
    let config = EngineConfig::default();
    let mut tree = TestTree::new(&config);
    let report = try_discover(&catalog(), &config, request, &mut tree).expect("discovery succeeds");
    (tree, report)
}

pub fn try_discover(
    inspector: &CatalogInspector,
    config: &EngineConfig,
    request: &DiscoveryRequest,
    tree: &mut TestTree,
) -> Result<DiscoveryReport, DiscoveryError> {
    EngineDiscoveryResolver::new(inspector, config).resolve(request, tree)
}

/// Identifiers of every node below the root, in pre-order.
pub fn descendant_ids(tree: &TestTree) -> Vec<Identifier> {
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.get(id))
        .map(|node| node.identifier().clone())
        .collect()
}

pub fn node(tree: &TestTree, identifier: &Identifier) -> NodeId {
    tree.find(identifier)
        .unwrap_or_else(|| panic!("no node {identifier}"))
}

// ============================================================================
// Fixture identifiers
// ============================================================================

pub fn engine_id() -> Identifier {
    Identifier::root().append(segment_type::ENGINE, "sift")
}

pub fn container_id(simple: &str) -> Identifier {
    engine_id().append(segment_type::CONTAINER, format!("{PKG}.{simple}"))
}

pub fn method_id(container: &str, signature: &str) -> Identifier {
    container_id(container).append(segment_type::TEST, signature)
}

pub fn factory_id(container: &str, signature: &str) -> Identifier {
    container_id(container).append(segment_type::FACTORY, signature)
}

pub fn template_id(container: &str, signature: &str) -> Identifier {
    container_id(container).append(segment_type::TEMPLATE, signature)
}

pub fn nesting_id() -> Identifier {
    container_id("TestCaseWithNesting")
}

pub fn nested_id() -> Identifier {
    nesting_id().append(segment_type::NESTED_CONTAINER, "NestedTestCase")
}

pub fn double_nested_id() -> Identifier {
    nested_id().append(segment_type::NESTED_CONTAINER, "DoubleNestedTestCase")
}

/// Fully qualified fixture container name.
pub fn fqn(simple: &str) -> String {
    format!("{PKG}.{simple}")
}
