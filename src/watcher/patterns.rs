//! Watch pattern ownership and best-effort override loading.
//!
//! The pattern set is fixed for the server process lifetime: project
//! defaults (config/component files under `app/` plus the root manifest)
//! joined with the equivalent patterns rooted at each watch-enabled
//! external ensemble. Loading is tolerant - a missing or malformed
//! ensemble declaration degrades to the defaults with a warning, never a
//! startup failure.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alias::EnsembleOverride;
use crate::config::{EnsembleConfig, Settings};

/// Where a watch pattern came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternOrigin {
    /// Default project pattern, relative to the workspace root.
    Project,
    /// Pattern rooted at a named external ensemble.
    Ensemble(String),
}

/// An immutable glob string plus its origin. Never mutated after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPattern {
    pub glob: String,
    pub origin: PatternOrigin,
}

impl WatchPattern {
    fn project(glob: impl Into<String>) -> Self {
        Self {
            glob: glob.into(),
            origin: PatternOrigin::Project,
        }
    }

    fn ensemble(glob: impl Into<String>, name: &str) -> Self {
        Self {
            glob: glob.into(),
            origin: PatternOrigin::Ensemble(name.to_string()),
        }
    }
}

/// Shape of the external indirection file (JSON).
#[derive(Debug, Deserialize)]
struct ExternalConfig {
    #[serde(default)]
    ensembles: Vec<EnsembleConfig>,
}

/// Default project patterns: component files under `app/` for each
/// configured extension, plus the root application manifest.
pub fn default_patterns(settings: &Settings) -> Vec<WatchPattern> {
    let mut patterns: Vec<WatchPattern> = settings
        .watch
        .extensions
        .iter()
        .map(|ext| WatchPattern::project(format!("app/**/*.{ext}")))
        .collect();

    patterns.push(WatchPattern::project(settings.manifest_path.clone()));
    patterns
}

/// Resolve the effective ensemble declarations.
///
/// The inline list from settings, unless the external indirection file is
/// present and readable, in which case its list replaces the inline one.
/// Any read or parse failure keeps the inline list with a warning.
fn effective_ensembles(settings: &Settings) -> Vec<EnsembleConfig> {
    let Some(ref external_path) = settings.external_config else {
        return settings.ensembles.clone();
    };

    let resolved = if external_path.is_absolute() {
        external_path.clone()
    } else {
        settings.resolved_root().join(external_path)
    };

    match std::fs::read_to_string(&resolved) {
        Ok(contents) => match serde_json::from_str::<ExternalConfig>(&contents) {
            Ok(external) => external.ensembles,
            Err(e) => {
                tracing::warn!(
                    "[config] malformed external config {}: {e}. Using inline ensembles.",
                    resolved.display()
                );
                settings.ensembles.clone()
            }
        },
        Err(e) => {
            tracing::warn!(
                "[config] cannot read external config {}: {e}. Using inline ensembles.",
                resolved.display()
            );
            settings.ensembles.clone()
        }
    }
}

/// Build the full pattern set and override list from configuration.
///
/// Overrides cover every external ensemble with a path (aliasing applies
/// even when watching is off for it); patterns are only added for
/// watch-enabled ensembles.
pub fn load_patterns_and_overrides(settings: &Settings) -> (Vec<WatchPattern>, Vec<EnsembleOverride>) {
    let mut patterns = default_patterns(settings);
    let mut overrides = Vec::new();

    for ensemble in effective_ensembles(settings) {
        if !ensemble.external {
            continue;
        }
        let Some(root) = ensemble.path else {
            continue;
        };

        if ensemble.watch_enabled {
            let root_str = root.to_string_lossy().replace('\\', "/");
            let root_str = root_str.trim_end_matches('/');
            for ext in &settings.watch.extensions {
                patterns.push(WatchPattern::ensemble(
                    format!("{root_str}/**/*.{ext}"),
                    &ensemble.name,
                ));
            }
        }

        overrides.push(EnsembleOverride {
            name: ensemble.name,
            physical_root: root,
            watch_enabled: ensemble.watch_enabled,
        });
    }

    (patterns, overrides)
}

/// Compiled pattern set used to filter raw watcher events.
#[derive(Debug)]
pub struct PatternSet {
    compiled: Vec<(glob::Pattern, PatternOrigin)>,
}

impl PatternSet {
    /// Compile patterns, skipping invalid globs with a warning.
    pub fn compile(patterns: &[WatchPattern]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            match glob::Pattern::new(&pattern.glob) {
                Ok(p) => compiled.push((p, pattern.origin.clone())),
                Err(e) => {
                    tracing::warn!("[watcher] skipping invalid pattern '{}': {e}", pattern.glob);
                }
            }
        }

        Self { compiled }
    }

    /// Check whether an event path matches any watched pattern.
    ///
    /// Project patterns are relative to the workspace root; ensemble
    /// patterns are absolute. Both forms are tried.
    pub fn matches(&self, absolute: &Path, root: &Path) -> bool {
        let relative = absolute.strip_prefix(root).ok();

        self.compiled.iter().any(|(pattern, _)| {
            pattern.matches_path(absolute)
                || relative.is_some_and(|rel| pattern.matches_path(rel))
        })
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True when nothing compiled (all patterns invalid).
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
