// src/builtin/tailwind.rs

//! `tailwind` provider: compiles `*.tailwind.css` sources with the
//! standalone Tailwind CLI.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::binary::{Platform, TailwindBinary};
use crate::config::ProviderOptions;
use crate::errors::{DevwatchError, Result};
use crate::exec::{ProcessSpec, run_to_completion, supervise};
use crate::lifecycle::ShutdownSignal;
use crate::provider::{Provider, ProviderContext, ProviderFuture};
use crate::types::ExitStatus;
use crate::watch::path_filter::PathFilter;
use crate::watch::transform::FileTransformationRule;

pub const SOURCE_PATTERN: &str = "*.tailwind.css";
pub const OUTPUT_PATTERN: &str = "{path}/{name}.css";
const DEFAULT_SOURCE_DIRS: &[&str] = &["apps", "assets"];
const DEFAULT_APPS_DIR: &str = "apps";

#[derive(Debug, Clone, Default)]
pub struct TailwindProvider;

/// One input and its compiled output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailwindJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TailwindProvider {
    pub fn executable(ctx: &ProviderContext, options: &ProviderOptions) -> PathBuf {
        match options.str("binary") {
            Some(path) => ctx.resolve(path),
            None => TailwindBinary::executable_path(&ctx.var_dir),
        }
    }

    /// Directories scanned for sources. With `app_id` set only that app's
    /// directory under `apps_dir` is scanned; otherwise every `source_dirs`
    /// entry (multi-app mode).
    pub fn source_dirs(options: &ProviderOptions) -> Vec<String> {
        if let Some(app) = options.str("app_id").map(str::trim).filter(|a| !a.is_empty()) {
            let apps_dir = options.str("apps_dir").unwrap_or(DEFAULT_APPS_DIR);
            return vec![format!("{}/{app}", apps_dir.trim_end_matches('/'))];
        }
        if options.get("source_dirs").is_none() {
            return DEFAULT_SOURCE_DIRS.iter().map(|s| s.to_string()).collect();
        }
        options.str_list("source_dirs")
    }

    /// All sources under the scanned directories, sorted.
    pub fn discover(ctx: &ProviderContext, options: &ProviderOptions) -> Result<Vec<TailwindJob>> {
        let dirs = Self::source_dirs(options);

        let rule = FileTransformationRule::new(SOURCE_PATTERN, OUTPUT_PATTERN)?;
        let filter = PathFilter::create_default();
        let mut inputs = Vec::new();
        for dir in dirs {
            let root = ctx.resolve(&dir);
            if root.is_dir() {
                collect_sources(&root, &rule, &filter, &mut inputs)?;
            } else {
                debug!(dir = ?root, "tailwind source dir missing");
            }
        }
        inputs.sort();
        inputs.dedup();

        Ok(inputs
            .into_iter()
            .map(|input| TailwindJob {
                output: rule.output_for(&input),
                input,
            })
            .collect())
    }

    fn minify(ctx: &ProviderContext, options: &ProviderOptions) -> bool {
        options.bool_or("minify", !ctx.is_dev())
    }

    fn spec(ctx: &ProviderContext, options: &ProviderOptions, job: &TailwindJob, watch: bool) -> ProcessSpec {
        let mut args = vec![
            "-i".to_string(),
            job.input.to_string_lossy().into_owned(),
            "-o".to_string(),
            job.output.to_string_lossy().into_owned(),
        ];
        if watch {
            args.push("--watch".to_string());
        }
        if Self::minify(ctx, options) {
            args.push("--minify".to_string());
        }
        let label = job
            .input
            .file_name()
            .map(|n| format!("tailwind {}", n.to_string_lossy()))
            .unwrap_or_else(|| "tailwind".to_string());
        ProcessSpec::exec(label, Self::executable(ctx, options), args).cwd(ctx.project_root.clone())
    }

    fn require_executable(ctx: &ProviderContext, options: &ProviderOptions) -> Result<()> {
        let exe = Self::executable(ctx, options);
        if exe.is_file() {
            Ok(())
        } else {
            Err(DevwatchError::Other(anyhow::anyhow!(
                "Tailwind executable not found at {}",
                exe.display()
            )))
        }
    }
}

fn collect_sources(
    dir: &Path,
    rule: &FileTransformationRule,
    filter: &PathFilter,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let walker = WalkDir::new(dir).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !filter.should_ignore_directory(&e.file_name().to_string_lossy())
    });
    for entry in walker {
        let entry = entry.map_err(|e| DevwatchError::IoError(e.into()))?;
        if entry.file_type().is_file() && rule.matches(&entry.file_name().to_string_lossy()) {
            out.push(entry.into_path());
        }
    }
    Ok(())
}

impl Provider for TailwindProvider {
    fn name(&self) -> &str {
        "tailwind"
    }

    fn service_order(&self) -> i32 {
        20
    }

    fn init<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            if Self::executable(ctx, options).is_file() {
                return Ok(());
            }
            if options.str("binary").is_some() {
                return Self::require_executable(ctx, options);
            }
            ctx.log.say("Tailwind CSS executable missing; downloading");
            let manager = TailwindBinary::manager_for(&ctx.var_dir, Platform::detect()?, ctx.source.clone());
            manager.ensure_latest(&ctx.log).await?;
            Ok(())
        })
    }

    fn build<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            let jobs = Self::discover(ctx, options)?;
            if jobs.is_empty() {
                ctx.log.say("No Tailwind sources found");
                return Ok(ExitStatus::Success);
            }
            Self::require_executable(ctx, options)?;

            let mut statuses = Vec::with_capacity(jobs.len());
            for job in &jobs {
                info!(input = ?job.input, output = ?job.output, "compiling tailwind source");
                let status = run_to_completion(&Self::spec(ctx, options, job, false), &ctx.log).await?;
                if status.is_success() {
                    ctx.log.say(format!("Compiled {}", job.output.display()));
                } else {
                    ctx.log.error(format!("Tailwind failed for {}", job.input.display()));
                }
                statuses.push(status);
            }
            Ok(ExitStatus::all(statuses))
        })
    }

    fn watch<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
        shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            let jobs = Self::discover(ctx, options)?;
            if jobs.is_empty() {
                ctx.log.say("No Tailwind sources found");
                return Ok(ExitStatus::Success);
            }
            Self::require_executable(ctx, options)?;

            let mut compilers = JoinSet::new();
            for job in &jobs {
                let spec = Self::spec(ctx, options, job, true);
                let log = ctx.log.clone();
                let signal = shutdown.clone();
                compilers.spawn(async move { supervise(&spec, &log, signal).await });
            }
            ctx.log.say(format!("Tailwind watching {} source(s)", jobs.len()));

            // First failing compiler ends the service; dropping the set
            // aborts the rest and kill_on_drop reaps their processes.
            while let Some(joined) = compilers.join_next().await {
                let status = match joined {
                    Ok(Ok(status)) => status,
                    Ok(Err(err)) => {
                        warn!(error = %err, "tailwind compiler failed");
                        ctx.log.error(format!("Tailwind compiler failed: {err}"));
                        ExitStatus::Failure
                    }
                    Err(err) => {
                        warn!(error = %err, "tailwind compiler task panicked");
                        ExitStatus::Failure
                    }
                };
                if !status.is_success() {
                    return Ok(ExitStatus::Failure);
                }
            }
            Ok(ExitStatus::Success)
        })
    }
}
