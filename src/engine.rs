// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine API
//!
//! An `Engine` bundles settings with an optional shared `ProgramCache` and
//! exposes every pipeline operation. The free functions at the crate root
//! run through a default engine.

use crate::ast::{evaluate, ExecutionOutcome, Program};
use crate::cache::{CacheKey, CacheStats, ProgramCache};
use crate::errors::{FormatError, KclError, ParseError};
use crate::io::{self, ExportArtifact, FileExportFormat, Token};
use crate::lint::{self, Diagnostic};
use crate::render::{self, ImageFormat, RenderedImage};
use crate::settings::EngineSettings;
use crate::units::UnitLength;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: EngineSettings,
    cache: Option<Arc<ProgramCache>>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings, cache: None }
    }

    /// Engine with default settings in `unit`
    pub fn with_units(unit: UnitLength) -> Self {
        Self::new(EngineSettings::with_units(unit))
    }

    /// Share `cache` with this engine; clones of the engine share it too
    pub fn with_cache(mut self, cache: Arc<ProgramCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, ParseError> {
        io::tokenize(source)
    }

    pub fn parse(&self, source: &str) -> Result<Program, ParseError> {
        io::parse(source)
    }

    pub fn format(&self, source: &str) -> Result<String, FormatError> {
        io::format(source)
    }

    /// Lint `source`, skipping the rules disabled in the settings
    pub fn lint(&self, source: &str) -> Vec<Diagnostic> {
        lint::lint_with(source, &self.settings.lint.disabled)
    }

    /// Parse and evaluate `source`
    pub fn run(&self, source: &str) -> Result<Arc<ExecutionOutcome>, KclError> {
        let options = self.settings.eval_options();
        let evaluate_source = || -> Result<ExecutionOutcome, KclError> {
            let program = io::parse(source)?;
            Ok(evaluate(&program, &options)?)
        };

        match &self.cache {
            Some(cache) => cache.get_or_try_insert(CacheKey::new(source, &options), evaluate_source),
            None => evaluate_source().map(Arc::new),
        }
    }

    pub fn execute(&self, source: &str) -> Result<(), KclError> {
        self.run(source).map(|_| ())
    }

    /// Evaluate `source` and render the scene
    pub fn snapshot(&self, source: &str, format: ImageFormat) -> Result<RenderedImage, KclError> {
        let outcome = self.run(source)?;
        Ok(render::render(&outcome.scene, format, &self.settings.render)?)
    }

    pub fn execute_and_snapshot(&self, source: &str, format: ImageFormat) -> Result<Vec<u8>, KclError> {
        self.snapshot(source, format).map(|image| image.bytes)
    }

    pub fn execute_and_export(
        &self,
        source: &str,
        format: FileExportFormat,
    ) -> Result<Vec<ExportArtifact>, KclError> {
        let outcome = self.run(source)?;
        let artifacts = io::export(&outcome.scene, format, &self.settings.export)?;
        log::debug!(
            format:% = format,
            artifacts = artifacts.len(),
            bytes = artifacts.iter().map(|a| a.contents.len()).sum::<usize>();
            "exported program"
        );
        Ok(artifacts)
    }
}
