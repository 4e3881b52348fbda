use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use turtle::{Canvas, Limits};

/// Name of the optional exercise options file inside the resources directory.
pub const OPTIONS_FILE: &str = "judge.toml";

pub const DEFAULT_SOLUTION: &str = "solution.turtle";

/// Bytes of the memory limit one stroke is charged for.
const BYTES_PER_STROKE: u64 = 1024;

/// Run configuration as the grading platform passes it on stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Bytes.
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Seconds.
    #[serde(default)]
    pub time_limit: Option<u64>,

    #[serde(default)]
    pub programming_language: Option<String>,

    #[serde(default = "default_language")]
    pub natural_language: String,

    /// Exercise resources, where the solution and `judge.toml` live.
    pub resources: PathBuf,

    /// The submitted script.
    pub source: PathBuf,

    #[serde(default)]
    pub judge: Option<PathBuf>,

    #[serde(default)]
    pub workdir: Option<PathBuf>,

    /// Overrides `judge.toml`.
    #[serde(default)]
    pub solution_file: Option<PathBuf>,

    /// Overrides `judge.toml`.
    #[serde(default)]
    pub diff_threshold: Option<u64>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Per-exercise options from `judge.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExerciseOptions {
    pub solution_file: Option<PathBuf>,
    pub diff_threshold: Option<u64>,
    pub canvas: CanvasOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExerciseOptions {
    /// Read `judge.toml` from `resources`; a missing file means all defaults.
    pub fn load(resources: &Path) -> Result<Self> {
        let path = resources.join(OPTIONS_FILE);
        if !path.exists() {
            return Ok(ExerciseOptions::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid {}", path.display()))
    }
}

/// Everything the grader needs, after merging defaults, `judge.toml` and
/// the run configuration (in increasing order of precedence).
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub source: PathBuf,
    pub solution: PathBuf,
    pub natural_language: String,
    pub diff_threshold: u64,
    pub canvas: Canvas,
    pub limits: Limits,
}

impl JudgeConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let run: RunConfig =
            serde_json::from_str(raw).context("cannot parse the run configuration")?;
        debug!(
            language = ?run.programming_language,
            judge = ?run.judge,
            workdir = ?run.workdir,
            "run configuration"
        );
        let options = ExerciseOptions::load(&run.resources)?;
        let config = JudgeConfig::merge(run, options);
        config.sanity_check()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn merge(run: RunConfig, options: ExerciseOptions) -> Self {
        let solution = run
            .solution_file
            .or(options.solution_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOLUTION));
        let solution = if solution.is_relative() {
            run.resources.join(solution)
        } else {
            solution
        };

        let defaults = Canvas::default();
        let canvas = Canvas {
            width: options.canvas.width.unwrap_or(defaults.width),
            height: options.canvas.height.unwrap_or(defaults.height),
        };

        let mut limits = Limits::default();
        if let Some(seconds) = run.time_limit {
            limits.timeout = Some(Duration::from_secs(seconds));
        }
        if let Some(bytes) = run.memory_limit {
            limits.max_strokes = usize::try_from(bytes / BYTES_PER_STROKE)
                .unwrap_or(usize::MAX)
                .max(1);
        }

        JudgeConfig {
            source: run.source,
            solution,
            natural_language: run.natural_language,
            diff_threshold: run.diff_threshold.or(options.diff_threshold).unwrap_or(0),
            canvas,
            limits,
        }
    }

    /// Catch exercise setup mistakes before anything runs.
    pub fn sanity_check(&self) -> Result<()> {
        if !self.source.is_file() {
            bail!("submission {} does not exist", self.source.display());
        }
        if !self.solution.is_file() {
            bail!("solution {} does not exist", self.solution.display());
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            bail!(
                "canvas must not be empty, got {}x{}",
                self.canvas.width,
                self.canvas.height
            );
        }
        Ok(())
    }
}
