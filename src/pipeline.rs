//! Entry points tying the stages together: build, validate, reduce.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::AnalysisContext;
use crate::cache::MetadataCache;
use crate::config::Config;
use crate::diagnostics::{self, DiagnosticEntity};
use crate::error::{PipelineError, ValidationFailure};
use crate::graph::{GraphBuilder, SymbolGraph};
use crate::reduce::{reduce, ReducedMetadata};

/// One analysis of one project root.
///
/// The graph is rebuilt from scratch by every [`Pipeline::generate_graph`]
/// call; only the metadata cache survives between builds.
pub struct Pipeline {
    root: PathBuf,
    config: Config,
    cache: Arc<MetadataCache>,
    graph: Option<SymbolGraph>,
}

impl Pipeline {
    pub fn new<P: AsRef<Path>>(root: P, config: Config) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
            cache: Arc::new(MetadataCache::new()),
            graph: None,
        }
    }

    /// Share a cache with other pipelines or earlier runs.
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The most recently generated graph.
    pub fn graph(&self) -> Option<&SymbolGraph> {
        self.graph.as_ref()
    }

    /// Scan the project and build a fresh graph, replacing any previous one.
    pub fn generate_graph(&mut self) -> Result<&SymbolGraph, PipelineError> {
        self.graph = None;
        let filter = self.config.path_filter()?;
        let context = AnalysisContext::new(&self.root);
        let files = context.scan(&filter);
        info!(
            root = %self.root.display(),
            module = context.module_path(),
            files = files.len(),
            "generating graph"
        );

        let builder = GraphBuilder::new(&context, &self.cache, &self.config);
        let graph = builder.build(&files).map_err(|failure| {
            for line in failure.diagnostic_stack() {
                warn!("{}", line);
            }
            failure
        })?;
        Ok(self.graph.insert(graph))
    }

    /// Run diagnostics over the most recently generated graph.
    pub fn validate(&self) -> Result<Vec<DiagnosticEntity>, PipelineError> {
        let graph = self.graph.as_ref().ok_or(PipelineError::NoGraph)?;
        Ok(diagnostics::validate(graph))
    }

    /// Build, validate and reduce. Fails if any diagnostic is an error.
    pub fn run(&mut self) -> Result<ReducedMetadata, PipelineError> {
        self.generate_graph()?;
        let entities = self.validate()?;
        if let Some(failure) = ValidationFailure::from_entities(&entities) {
            return Err(failure.into());
        }

        let graph = self.graph.as_ref().ok_or(PipelineError::NoGraph)?;
        Ok(reduce(graph, &self.config, &self.cache))
    }

    pub fn dump_dot(&self) -> Result<String, PipelineError> {
        self.graph
            .as_ref()
            .map(SymbolGraph::dump_dot)
            .ok_or(PipelineError::NoGraph)
    }

    pub fn dump_text(&self) -> Result<String, PipelineError> {
        self.graph
            .as_ref()
            .map(SymbolGraph::dump_text)
            .ok_or(PipelineError::NoGraph)
    }
}
