//! CLI front door.
//!
//! Implements `sift discover`:
//! 1. Load the element catalog (`--catalog`)
//! 2. Resolve the engine configuration (config file, environment, flags)
//! 3. Parse `--select` arguments into a discovery request
//! 4. Resolve the request and describe the tree as a [`DiscoveryResponse`]
//!
//! Malformed `--select` values do not fail the command; they are reported
//! as issues in the response like any other unresolved selector.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, SiftError>`. The caller (`main.rs`)
//! renders the error as JSON and exits with its code.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use sift_core::config::{CliOverrides, ConfigFile, EngineConfig, ResolvedConfig};
use sift_core::error::SiftError;
use sift_core::inspector::CatalogInspector;
use sift_core::output::DiscoveryResponse;
use sift_core::resolve::EngineDiscoveryResolver;
use sift_core::selector::DiscoveryRequest;
use sift_core::tree::TestTree;

/// Inputs of the discover command.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Path of the JSON element catalog.
    pub catalog: PathBuf,
    /// Selectors in text form, in the order given.
    pub selectors: Vec<String>,
    /// Optional JSON config file.
    pub config: Option<PathBuf>,
    /// Values given as CLI flags.
    pub overrides: CliOverrides,
}

/// Load an element catalog from a JSON file.
pub fn load_catalog(path: &Path) -> Result<CatalogInspector, SiftError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SiftError::catalog_load(path.display().to_string(), e.to_string()))?;
    CatalogInspector::from_json(&text)
        .map_err(|e| SiftError::catalog_load(path.display().to_string(), e.to_string()))
}

/// Resolve the engine configuration from the config file, the process
/// environment and CLI overrides.
pub fn resolve_engine_config(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<EngineConfig, SiftError> {
    let file = config_path.map(ConfigFile::load).transpose()?;
    let resolved = ResolvedConfig::resolve(file.as_ref(), overrides);
    debug!(
        "engine id '{}' from {:?}, default mode '{}' from {:?}",
        resolved.engine_id.value,
        resolved.engine_id.source,
        resolved.default_execution_mode.value,
        resolved.default_execution_mode.source
    );
    Ok(resolved.into_engine_config()?)
}

/// Run discovery and describe the resulting tree.
pub fn run_discover(options: &DiscoverOptions) -> Result<DiscoveryResponse, SiftError> {
    let inspector = load_catalog(&options.catalog)?;
    let config = resolve_engine_config(options.config.as_deref(), &options.overrides)?;

    let request = options
        .selectors
        .iter()
        .fold(DiscoveryRequest::builder(), |builder, text| {
            builder.parse_selector(text)
        })
        .build();

    let mut tree = TestTree::new(&config);
    let report = EngineDiscoveryResolver::new(&inspector, &config).resolve(&request, &mut tree)?;
    info!(
        "Discovered {} node(s) from {} selector(s); {} issue(s).",
        tree.len(),
        options.selectors.len(),
        report.issues().len()
    );

    Ok(DiscoveryResponse::new(&tree, &report, &config))
}

// ============================================================================
// Tests
// ============================================================================
