//! Bookshelf application library
//!
//! Holds the application modules and the process lifecycle shared by the
//! `bookshelf-app` binary and the `bookshelf` CLI.

pub mod modules;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every application module
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings);
    registry
}

/// Initialize modules, build the router and serve it
///
/// Returns once the server has shut down and every module has been stopped.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .init_all(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_all(&ctx)
        .await
        .context("module startup failed")?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    registry
        .stop_all()
        .await
        .context("module shutdown failed")?;

    served
}
