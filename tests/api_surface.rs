//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Identifiers and selectors
// ============================================================================

use sift::identifier::{segment_type, Identifier, IdentifierError, Segment};

use sift::selector::{
    DiscoveryRequest, DiscoveryRequestBuilder, MemberSignature, RejectedSelector, Selector,
    SelectorError,
};

// ============================================================================
// Inspection
// ============================================================================

use sift::inspector::{
    CatalogInspector, ContainerInfo, ElementInspector, InspectorError, Markers, MemberInfo,
    MemberKind, ResourceLockMarker,
};

// ============================================================================
// Tree, resolution and filters
// ============================================================================

use sift::tree::{NodeData, NodeId, NodeKind, TestNode, TestTree, TreeError};

use sift::context::ResolutionContext;

use sift::resolve::{is_valid_tag, EngineDiscoveryResolver};

use sift::filter::{DynamicDescendantFilter, FilterContribution};

use sift::report::{DiscoveryReport, IssueKind, ResolutionIssue};

// ============================================================================
// Execution metadata and skipping
// ============================================================================

use sift::metadata::{
    ExclusiveResource, ExecutionDeclarations, ExecutionMetadata, ExecutionMetadataResolver,
    ExecutionMode, LockMode,
};

use sift::skip::{
    should_be_skipped, ConditionEvaluator, ConditionResult, DeferredFailures, ExecutionError,
    SkipResult, UNKNOWN_REASON,
};

// ============================================================================
// Configuration, errors and output
// ============================================================================

use sift::config::{
    CliOverrides, ConfigFile, ConfigSource, ConfigValue, EngineConfig, ResolvedConfig,
    DEFAULT_ENGINE_ID, ENV_DEFAULT_EXECUTION_MODE, ENV_ENGINE_ID,
};

use sift::error::{ConfigurationError, DiscoveryError, OutputErrorCode, SiftError};

use sift::output::{
    emit_response, DiscoveryResponse, ErrorInfo, ErrorResponse, FilterInfo, IssueInfo, NodeInfo,
    SCHEMA_VERSION,
};

use sift::types::SourceLocation;

// ============================================================================
// Front door
// ============================================================================

use sift::cli::{load_catalog, resolve_engine_config, run_discover, DiscoverOptions};

#[test]
fn api_surface_compiles() {
    // This test passes if the file compiles.
    let _ = std::any::type_name::<Identifier>();
    let _ = std::any::type_name::<TestTree>();
    let _ = std::any::type_name::<EngineDiscoveryResolver<'static>>();
    let _ = std::any::type_name::<DynamicDescendantFilter>();
    let _ = std::any::type_name::<SiftError>();
    let _ = std::any::type_name::<DiscoveryResponse>();
}

#[test]
fn schema_version_is_stable() {
    // The schema version is part of the public API contract
    assert_eq!(SCHEMA_VERSION, "1");
}
