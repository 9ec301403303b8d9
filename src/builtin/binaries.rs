// src/builtin/binaries.rs

//! `binaries` provider: init-only wrapper around the install routine.

use crate::binary::{BinaryRegistry, InstallPlan, install_binaries};
use crate::config::ProviderOptions;
use crate::errors::{DevwatchError, Result};
use crate::lifecycle::ShutdownSignal;
use crate::provider::{Provider, ProviderContext, ProviderFuture};
use crate::types::ExitStatus;

#[derive(Debug, Clone, Default)]
pub struct BinariesProvider;

impl BinariesProvider {
    pub fn plan(ctx: &ProviderContext, options: &ProviderOptions) -> InstallPlan {
        InstallPlan {
            required: options.str_list("required"),
            var_dir: ctx.var_dir.clone(),
            public_vendor_dir: ctx.public_vendor_dir.clone(),
            remote: ctx.source.clone(),
        }
    }

    async fn install(ctx: &ProviderContext, options: &ProviderOptions) -> Result<ExitStatus> {
        let registry = BinaryRegistry::from_options(options)?;
        Ok(install_binaries(&registry, &Self::plan(ctx, options), &ctx.log).await)
    }
}

impl Provider for BinariesProvider {
    fn name(&self) -> &str {
        "binaries"
    }

    fn service_order(&self) -> i32 {
        10
    }

    fn init<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            match Self::install(ctx, options).await? {
                ExitStatus::Success => Ok(()),
                ExitStatus::Failure => Err(DevwatchError::AcquisitionError(
                    "not all required binaries could be installed".to_string(),
                )),
            }
        })
    }

    fn build<'a>(&'a self, ctx: &'a ProviderContext, options: &'a ProviderOptions) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(Self::install(ctx, options))
    }

    fn watch<'a>(
        &'a self,
        _ctx: &'a ProviderContext,
        _options: &'a ProviderOptions,
        _shutdown: ShutdownSignal,
    ) -> ProviderFuture<'a, ExitStatus> {
        Box::pin(async move { Ok(ExitStatus::Success) })
    }
}
