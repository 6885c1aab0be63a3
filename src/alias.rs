//! Alias table and logical path rewriting.
//!
//! Maps a changed file's physical location into the logical addressing
//! scheme clients use: paths under an externally-mounted ensemble root
//! become `@name/relative`, everything else stays relative to the
//! workspace root. Built once per server start, read-only afterwards.

use std::path::{Path, PathBuf};

use crate::config::Settings;

/// One externally-mounted ensemble root with its logical alias name.
///
/// `physical_root` is expected to be absolute. Matching is component-wise,
/// so `/mnt/shared` does not claim paths under `/mnt/shared-extra`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleOverride {
    pub name: String,
    pub physical_root: PathBuf,
    pub watch_enabled: bool,
}

/// Static mapping from physical path prefixes to logical ensemble names.
///
/// Resolution is order-dependent: the first override in declaration order
/// whose root is a prefix of the changed path wins. Overlapping roots are
/// a configuration mistake and are warned about at construction, but the
/// table stays usable with the documented first-match policy.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    overrides: Vec<EnsembleOverride>,
}

impl AliasTable {
    /// Build a table from override entries, warning on overlapping roots.
    pub fn new(overrides: Vec<EnsembleOverride>) -> Self {
        for (i, a) in overrides.iter().enumerate() {
            for b in overrides.iter().skip(i + 1) {
                if b.physical_root.starts_with(&a.physical_root)
                    || a.physical_root.starts_with(&b.physical_root)
                {
                    tracing::warn!(
                        "[alias] overlapping ensemble roots: '{}' ({}) and '{}' ({}); \
                         first declaration wins",
                        a.name,
                        a.physical_root.display(),
                        b.name,
                        b.physical_root.display()
                    );
                }
            }
        }

        Self { overrides }
    }

    /// Build a table from configured ensembles.
    ///
    /// Only external ensembles with a path participate in aliasing.
    pub fn from_settings(settings: &Settings) -> Self {
        let overrides = settings
            .ensembles
            .iter()
            .filter(|e| e.external)
            .filter_map(|e| {
                e.path.as_ref().map(|path| EnsembleOverride {
                    name: e.name.clone(),
                    physical_root: path.clone(),
                    watch_enabled: e.watch_enabled,
                })
            })
            .collect();

        Self::new(overrides)
    }

    /// The override entries, in declaration order.
    pub fn overrides(&self) -> &[EnsembleOverride] {
        &self.overrides
    }

    /// Rewrite a physical path into its logical form.
    ///
    /// Total and pure: every input either matches an override
    /// (`@name/relative`) or falls through to the root-relative form.
    /// Separators are normalized to `/` in either case.
    pub fn rewrite(&self, physical: &Path, root: &Path) -> String {
        let absolute = if physical.is_absolute() {
            physical.to_path_buf()
        } else {
            root.join(physical)
        };

        for entry in &self.overrides {
            if let Ok(relative) = absolute.strip_prefix(&entry.physical_root) {
                return format!("@{}/{}", entry.name, normalize_separators(relative));
            }
        }

        match absolute.strip_prefix(root) {
            Ok(relative) => normalize_separators(relative),
            // Outside the root with no override: pass the path through
            // rather than fail, keeping the function total.
            Err(_) => normalize_separators(&absolute),
        }
    }
}

/// Render a path with forward slashes regardless of platform.
fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
