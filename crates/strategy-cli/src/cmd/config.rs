use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;
use strategy_core::config::ClientConfig;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the settings in effect and where they came from
    Show,
    /// Change one setting in the config file
    Set { key: ConfigKey, value: String },
    /// Remove one setting from the config file
    Unset { key: ConfigKey },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ConfigKey {
    ServerUrl,
    User,
    DebounceMs,
    LoadTimeoutSecs,
    CacheDir,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx, json),
        ConfigSubcommand::Set { key, value } => set(ctx, key, Some(value), json),
        ConfigSubcommand::Unset { key } => set(ctx, key, None, json),
    }
}

fn show(ctx: &Context, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "configPath": ctx.config_path.display().to_string(),
            "file": ctx.config,
            "effective": {
                "server": ctx.server,
                "user": ctx.user,
                "cacheDir": ctx.cache_dir.display().to_string(),
            },
        }));
    }

    println!("Config file:  {}", ctx.config_path.display());
    println!(
        "Server:       {}",
        ctx.server.as_deref().unwrap_or("(none, local cache only)")
    );
    println!("User:         {}", ctx.user);
    println!("Cache dir:    {}", ctx.cache_dir.display());
    println!("Debounce:     {} ms", ctx.config.debounce_ms);
    println!("Load timeout: {} s", ctx.config.load_timeout_secs);
    Ok(())
}

fn set(ctx: &Context, key: ConfigKey, value: Option<String>, json: bool) -> anyhow::Result<()> {
    let mut config = ctx.config.clone();
    let value = value.map(|v| v.trim().to_string());
    match key {
        ConfigKey::ServerUrl => config.server_url = value.clone(),
        ConfigKey::User => config.user = value.clone(),
        ConfigKey::CacheDir => config.cache_dir = value.clone().map(PathBuf::from),
        ConfigKey::DebounceMs => {
            config.debounce_ms = match &value {
                Some(v) => v.parse().with_context(|| format!("invalid debounce-ms '{v}'"))?,
                None => ClientConfig::default().debounce_ms,
            }
        }
        ConfigKey::LoadTimeoutSecs => {
            config.load_timeout_secs = match &value {
                Some(v) => v
                    .parse()
                    .with_context(|| format!("invalid load-timeout-secs '{v}'"))?,
                None => ClientConfig::default().load_timeout_secs,
            }
        }
    }
    config
        .save(&ctx.config_path)
        .with_context(|| format!("cannot write {}", ctx.config_path.display()))?;

    let name = key
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default();
    if json {
        print_json(&serde_json::json!({ "key": name, "value": value }))?;
    } else {
        match value {
            Some(v) => println!("Set {name} = {v}"),
            None => println!("Unset {name}"),
        }
    }
    Ok(())
}
