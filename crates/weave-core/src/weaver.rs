//! Weave pipeline
//!
//! One sequential pass per run:
//!
//! 0. validate the configuration
//! 1. decode the aspect specification
//! 2. load the target package
//! 3. match references against pointcuts (zero matches ends the run
//!    without writing anything)
//! 4. relocate the advice unit into the overlay
//! 5. rewrite and materialize every unit holding join points
//! 6. reconcile the rest of the overlay with symlinks
//!
//! The first fatal error ends the run; files already written stay.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use weave_overlay::{
    reconcile, relocate_advice_unit, Materializer, OverlayError, OverlayLayout, ReconcileReport,
};
use weave_pointcut::{AspectSpec, Diagnostic, Matcher};
use weave_program::{FrontEnd, GoFrontEnd, TargetProgram};
use weave_rewrite::{rewrite_unit, CodegenOptions, WeaveSession};

use crate::config::WeaveConfig;
use crate::error::{ConfigError, WeaveError};

/// Result of a successful run
#[derive(Debug, Clone, Default, Serialize)]
pub struct WeaveOutcome {
    /// Overlay files written (rewritten units and the advice unit)
    pub written: Vec<PathBuf>,
    /// What reconciliation did
    pub report: ReconcileReport,
    /// Non-fatal matching diagnostics
    pub diagnostics: Vec<Diagnostic>,
    /// Number of join points woven
    pub join_points: usize,
}

impl WeaveOutcome {
    /// No join point matched; nothing was written
    #[inline]
    #[must_use]
    pub fn is_nothing_to_do(&self) -> bool {
        self.join_points == 0
    }
}

/// Runs the weave pipeline for one configuration
pub struct Weaver {
    config: WeaveConfig,
    front_end: Box<dyn FrontEnd>,
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weaver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Weaver {
    /// Weaver using the tree-sitter Go front end
    #[must_use]
    pub fn new(config: WeaveConfig) -> Self {
        let front_end = GoFrontEnd::new().with_aspect_suffix(config.aspect_suffix.clone());
        Self {
            config,
            front_end: Box::new(front_end),
        }
    }

    /// Replace the program front end
    #[must_use]
    pub fn with_front_end(mut self, front_end: Box<dyn FrontEnd>) -> Self {
        self.front_end = front_end;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Run every phase.
    ///
    /// # Errors
    /// The first fatal [`WeaveError`] of any phase.
    pub fn run(&self) -> Result<WeaveOutcome, WeaveError> {
        // Phase 0: configuration
        self.config.validate()?;
        let (Some(target), Some(overlay), [aspect_file]) = (
            self.config.target.as_deref(),
            self.config.overlay_root.as_deref(),
            self.config.aspect_files.as_slice(),
        ) else {
            return Err(ConfigError::MissingTarget.into());
        };

        // Phase 1: aspect specification
        let spec = AspectSpec::from_path(aspect_file)?;
        info!(
            path = %aspect_file.display(),
            aspects = spec.aspects.len(),
            "decoded aspect specification"
        );

        // Phase 2: target program
        let program = self.front_end.load(&self.config.source_root, target)?;
        info!(
            package = %target,
            units = program.units.len(),
            references = program.symbols.use_count(),
            "loaded target package"
        );

        // Phase 3: matching
        let matches = Matcher::from_spec(&spec).match_all(&program);
        if matches.is_empty() {
            info!(package = %target, "no join points matched, nothing to do");
            return Ok(WeaveOutcome {
                diagnostics: matches.diagnostics().to_vec(),
                ..WeaveOutcome::default()
            });
        }

        let overlay = absolute(overlay)?;
        let layout = OverlayLayout::new(program.root(), &overlay);
        let mut materializer = Materializer::new(layout.clone());
        let advice_package = self
            .config
            .advice_package
            .as_deref()
            .unwrap_or_else(|| spec.advice_package_name());
        let mut options = CodegenOptions::for_layout(&program.layout, advice_package)
            .with_runtime(&self.config.runtime_import, &self.config.runtime_alias);
        if let Some(alias) = &self.config.advice_alias {
            let import = options.advice_import.clone();
            options = options.with_advice(import, alias.as_str());
        }

        // Phase 4: advice unit
        if let Some(source) = &spec.advice_source {
            write_advice_unit(&program, &options, source, advice_package, &mut materializer)?;
        }

        // Phase 5: rewrite and materialize
        let mut session = WeaveSession::new(self.config.naming);
        for unit in program.woven_units() {
            let points = matches.for_unit(unit.id);
            if let Some(rewritten) =
                rewrite_unit(&program, unit, &points, &mut session, &options)?
            {
                materializer.materialize(&rewritten)?;
            }
        }

        // Phase 6: reconciliation
        let report = reconcile(&layout, materializer.written(), &self.config.aspect_suffix)?;

        let outcome = WeaveOutcome {
            written: materializer.written_overlay_paths(),
            report,
            diagnostics: matches.diagnostics().to_vec(),
            join_points: matches.len(),
        };
        info!(
            overlay = %overlay.display(),
            written = outcome.written.len(),
            linked = outcome.report.linked.len(),
            join_points = outcome.join_points,
            diagnostics = outcome.diagnostics.len(),
            "weave complete"
        );
        Ok(outcome)
    }
}

fn write_advice_unit(
    program: &TargetProgram,
    options: &CodegenOptions,
    source: &Path,
    package_name: &str,
    materializer: &mut Materializer,
) -> Result<(), WeaveError> {
    let text = relocate_advice_unit(source, package_name)?;
    let dir = program
        .layout
        .relative_dir(&options.advice_import)
        .unwrap_or_else(|| PathBuf::from(package_name));
    let Some(file_name) = source.file_name() else {
        warn!(path = %source.display(), "advice source has no file name, skipping");
        return Ok(());
    };
    let destination = dir.join(file_name);
    materializer.write_file(&destination, &text)?;
    info!(
        path = %destination.display(),
        package = package_name,
        "relocated advice unit"
    );
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, WeaveError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| OverlayError::io_error(path, e))?;
    Ok(cwd.join(path))
}
