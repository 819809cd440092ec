// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration
//!
//! Settings are plain data. `load` reads `kcl.toml` from the working
//! directory when present and then applies `KCL_*` environment overrides.

use crate::ast::EvalOptions;
use crate::io::ExportOptions;
use crate::render::RenderOptions;
use crate::units::UnitLength;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deepest call nesting the evaluator may be configured for
pub const MAX_CALL_DEPTH_LIMIT: usize = 256;

pub const SETTINGS_FILE: &str = "kcl.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationSettings {
    /// Facets per full turn of a circle, arc or revolution
    pub segments: u32,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self { segments: 48 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub max_call_depth: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self { max_call_depth: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    /// Rule codes to skip, e.g. `["Z0005"]`
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub units: UnitLength,
    pub render: RenderOptions,
    pub tessellation: TessellationSettings,
    pub evaluation: EvaluationSettings,
    pub lint: LintSettings,
    pub export: ExportOptions,
}

impl EngineSettings {
    pub fn with_units(units: UnitLength) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: EngineSettings = toml::from_str(content).context("Failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid settings file: {:?}", path.as_ref()))
    }

    /// Load settings with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut settings = if PathBuf::from(SETTINGS_FILE).exists() {
            Self::from_file(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `KCL_UNITS`, `KCL_RENDER_WIDTH` and `KCL_RENDER_HEIGHT`
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(units) = var("KCL_UNITS") {
            self.units = units
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid KCL_UNITS")?;
        }
        if let Some(width) = var("KCL_RENDER_WIDTH") {
            self.render.width = width.trim().parse().context("Invalid KCL_RENDER_WIDTH")?;
        }
        if let Some(height) = var("KCL_RENDER_HEIGHT") {
            self.render.height = height.trim().parse().context("Invalid KCL_RENDER_HEIGHT")?;
        }
        Ok(())
    }

    /// Save settings to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write settings file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tessellation.segments < 3 {
            bail!("tessellation.segments must be at least 3, got {}", self.tessellation.segments);
        }
        if self.evaluation.max_call_depth == 0 || self.evaluation.max_call_depth > MAX_CALL_DEPTH_LIMIT {
            bail!(
                "evaluation.max_call_depth must be between 1 and {}, got {}",
                MAX_CALL_DEPTH_LIMIT,
                self.evaluation.max_call_depth
            );
        }
        if self.render.width == 0 || self.render.height == 0 {
            bail!("render size must be non-zero, got {}x{}", self.render.width, self.render.height);
        }
        if !(self.render.fov_degrees > 0.0 && self.render.fov_degrees < 180.0) {
            bail!("render.fov_degrees must be between 0 and 180, got {}", self.render.fov_degrees);
        }
        Ok(())
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            unit: self.units,
            segments: self.tessellation.segments,
            max_call_depth: self.evaluation.max_call_depth,
        }
    }
}
