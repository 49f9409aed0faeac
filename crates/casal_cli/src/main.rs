//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one sign-up / household / category / logout cycle against in-memory
//!   remote backends and the configured on-disk cache.
//! - Print every session transition so wiring problems show up immediately.

use casal_core::{
    init_logging, AccountService, CategoryService, HouseholdService, MemoryIdentityProvider,
    MemoryRecordStore, SessionCache, SessionConfig, SessionReconciler, SignUpRequest,
};
use log::info;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("casal smoke failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = SessionConfig::from_env().map_err(|err| err.to_string())?;
    let cwd = std::env::current_dir().map_err(|err| err.to_string())?;
    let log_dir = config
        .cache_path
        .parent()
        .map_or_else(|| cwd.clone(), |dir| cwd.join(dir));
    init_logging(config.log_level, &log_dir.to_string_lossy())?;

    println!("casal_core version={}", casal_core::core_version());

    let provider = Arc::new(MemoryIdentityProvider::new());
    let store = Arc::new(MemoryRecordStore::new());
    let cache_store = config.open_cache().map_err(|err| err.to_string())?;
    println!("cache path={}", config.cache_path.display());
    let reconciler = SessionReconciler::new(
        provider.clone(),
        store.clone(),
        SessionCache::new(Arc::new(cache_store)),
        &config,
    );
    reconciler.observe(|state| {
        println!(
            "session phase={} freshness={} loading={}",
            state.phase().as_str(),
            state.freshness().map_or("none", |freshness| freshness.as_str()),
            state.is_loading()
        );
    });
    reconciler.start();

    let accounts = AccountService::new(provider, store.clone(), reconciler.clone());
    let households = HouseholdService::new(store.clone(), reconciler.clone());
    let categories = CategoryService::new(store, reconciler.clone());

    accounts
        .sign_up(&SignUpRequest {
            display_name: "Smoke".to_string(),
            email: "smoke@casal.local".to_string(),
            secret: "smoke-secret".to_string(),
            confirm_secret: "smoke-secret".to_string(),
        })
        .map_err(|err| format!("sign_up: {err}"))?;

    let state = households
        .create_household("Smoke household")
        .map_err(|err| format!("create_household: {err}"))?;
    if let Some(household) = state.household_record() {
        println!("household id={} members={}", household.id, household.member_ids.len());
    }

    categories
        .add_category("Groceries")
        .map_err(|err| format!("add_category: {err}"))?;
    let listed = categories
        .list_categories()
        .map_err(|err| format!("list_categories: {err}"))?;
    println!("categories count={}", listed.len());

    reconciler.logout();
    reconciler.shutdown();
    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}
