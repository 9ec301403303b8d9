// src/builtin/command.rs

//! `exec` provider: runs an arbitrary external command as a service.
//!
//! ```toml
//! [services.api.options]
//! cmd = "php -S 127.0.0.1:8000 -t public"
//! build_cmd = "composer dump-autoload"
//! ready_on_stdout = "Development Server .* started"
//! ```

use std::time::Duration;

use regex::Regex;

use crate::config::ProviderOptions;
use crate::errors::{DevwatchError, Result};
use crate::exec::{ProcessSpec, run_to_completion, supervise};
use crate::lifecycle::ShutdownSignal;
use crate::provider::{Provider, ProviderContext, ProviderFuture};
use crate::types::ExitStatus;

const DEFAULT_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default)]
pub struct CommandProvider;

impl CommandProvider {
    fn ready_pattern(options: &ProviderOptions) -> Result<Option<Regex>> {
        options
            .str("ready_on_stdout")
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    DevwatchError::ConfigError(format!("invalid ready_on_stdout regex '{pattern}': {e}"))
                })
            })
            .transpose()
    }

    fn spec(ctx: &ProviderContext, options: &ProviderOptions, cmd: &str) -> Result<ProcessSpec> {
        let cwd = options
            .str("cwd")
            .map(|d| ctx.resolve(d))
            .unwrap_or_else(|| ctx.project_root.clone());
        let mut spec = ProcessSpec::shell(ctx.service_id.clone(), cmd)
            .cwd(cwd)
            .grace(options.duration_secs_or("stop_grace", DEFAULT_GRACE));
        if let Some(re) = Self::ready_pattern(options)? {
            spec = spec.ready_on(re);
        }
        Ok(spec)
    }
}

impl Provider for CommandProvider {
    fn name(&self) -> &str {
        "exec"
    }

    fn service_order(&self) -> i32 {
        50
    }

    fn init<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            Self::ready_pattern(options)?;
            if options.str("cmd").is_none() && options.str("build_cmd").is_none() {
                return Err(DevwatchError::ConfigError(format!(
                    "exec service '{}' needs `cmd` or `build_cmd`",
                    ctx.service_id
                )));
            }
            Ok(())
        })
    }

    fn build<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            match options.str("build_cmd") {
                Some(cmd) => run_to_completion(&Self::spec(ctx, options, cmd)?, &ctx.log).await,
                None => Ok(ExitStatus::Success),
            }
        })
    }

    fn watch<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        options: &'a ProviderOptions,
        shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move {
            let cmd = options.str("cmd").ok_or_else(|| {
                DevwatchError::ConfigError(format!("exec service '{}' has no `cmd`", ctx.service_id))
            })?;
            supervise(&Self::spec(ctx, options, cmd)?, &ctx.log, shutdown).await
        })
    }
}
