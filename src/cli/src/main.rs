mod cli;
mod config;
mod platform;

use crate::cli::{Cli, Command};
use crate::config::VigilConfigs;
use crate::platform::{PackageListService, UserDirectoryEnumerator, VerifiedGate};
use anyhow::{Result, bail};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::runtime::Builder;
use vigil_core::platform::BooleanPreferenceStore;
use vigil_core::prefs::TomlPrefs;
use vigil_core::{OpKind, PolicyEngine, Presentation, Services, authority_for, cleanup};

fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse_args();
    VigilConfigs::init(&args)?;

    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args.command))?;

    Ok(())
}

async fn async_main(command: Command) -> Result<()> {
    let services = platform::services()?;

    match command {
        Command::List { kind } => list(kind, &services).await,
        Command::Allow { kind, package } => set(kind, &package, true, &services).await,
        Command::Deny { kind, package } => set(kind, &package, false, &services).await,
        Command::Purge { package } => purge(&package, &services),
    }
}

fn engine_for(kind: OpKind, services: &Services) -> Arc<PolicyEngine> {
    PolicyEngine::new(
        authority_for(kind, services),
        Arc::new(UserDirectoryEnumerator::new()),
        Arc::new(PackageListService::new()),
        Arc::new(VerifiedGate),
    )
}

async fn refreshed(engine: &Arc<PolicyEngine>) -> Result<Presentation> {
    if let Some(pass) = engine.refresh() {
        pass.await?;
    }
    Ok(engine.presentation())
}

async fn list(kind: OpKind, services: &Services) -> Result<()> {
    let engine = engine_for(kind, services);
    let presented = refreshed(&engine).await?;

    if presented.rows.is_empty() {
        println!("no tracked apps for {kind}");
        return Ok(());
    }

    for (i, row) in presented.rows.iter().enumerate() {
        if i == 0 && presented.allow_count > 0 {
            println!("allowed:");
        }
        if i == presented.allow_count && presented.deny_count > 0 {
            println!("denied:");
        }
        println!("  {} ({})", row.label, row.key);
    }

    Ok(())
}

async fn set(kind: OpKind, package: &str, allow: bool, services: &Services) -> Result<()> {
    let engine = engine_for(kind, services);
    let presented = refreshed(&engine).await?;

    let Some(row) = presented.rows.iter().find(|row| row.package == package) else {
        bail!("{package} is not tracked for {kind}");
    };

    engine.toggle(&row.key, allow)?;
    println!(
        "{package}: {}",
        if allow { "allowed" } else { "denied" }
    );

    Ok(())
}

fn purge(package: &str, services: &Services) -> Result<()> {
    let configs = VigilConfigs::instance();

    let stores: Vec<TomlPrefs> = OpKind::iter()
        .map(|kind| TomlPrefs::open(&configs.data_dir, kind.pref_namespace()))
        .collect::<Result<_, _>>()?;
    let store_refs: Vec<&dyn BooleanPreferenceStore> =
        stores.iter().map(|s| s as &dyn BooleanPreferenceStore).collect();

    cleanup::purge_removed_package(0, package, &store_refs, services.policy.as_ref());

    println!("{package}: purged");
    Ok(())
}
