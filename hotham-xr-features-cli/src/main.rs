use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hotham_xr_features::{
    plan_build, validate, BuildTargetGroup, FeatureConfig, FeatureManifest, FeatureSettings,
    LoaderArbiter,
};
use log::{debug, info};

#[derive(Parser)]
#[command(
    name = "hotham-xr-features",
    about = "Resolve OpenXR features, loaders and native plugins for a build target"
)]
struct Args {
    /// Path to the JSON feature manifest
    #[arg(short, long, global = true, default_value = "openxr_features.json")]
    manifest: PathBuf,

    /// Path to the JSON project configuration. Defaults are used if it's missing.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Build target group, eg. `android` or `standalone`
    #[arg(short, long, global = true, default_value = "android")]
    target: BuildTargetGroup,

    /// Log everything
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the active loader, the requested API version and the plugins to include
    Resolve,
    /// Print validation issues. Fails if any of them is an error.
    Validate,
    /// Print the order enabled features receive OpenXR events in
    Order,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let manifest = FeatureManifest::load(&args.manifest)
        .with_context(|| format!("Unable to load manifest {}", args.manifest.display()))?;
    let config = load_config(args.config.as_deref())?;
    let settings = settings_for(&manifest, &config, args.target)?;

    match args.command {
        Command::Resolve => resolve(&settings, &manifest, &config),
        Command::Validate => check(&settings),
        Command::Order => {
            for (position, feature) in settings.enabled_features().enumerate() {
                println!(
                    "{}. {} (priority {})",
                    position + 1,
                    feature.id(),
                    feature.descriptor().priority
                );
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FeatureConfig> {
    match path {
        Some(path) => FeatureConfig::load(path)
            .with_context(|| format!("Unable to load configuration {}", path.display())),
        None => {
            debug!("No configuration given, using defaults");
            Ok(FeatureConfig::default())
        }
    }
}

fn settings_for(
    manifest: &FeatureManifest,
    config: &FeatureConfig,
    target: BuildTargetGroup,
) -> Result<FeatureSettings> {
    let registry = manifest.registry()?;
    let mut settings = registry.settings_for(target);
    settings.apply_config(&config.target(target))?;
    info!(
        "{} of {} feature(s) enabled for {target}",
        settings.enabled_features().count(),
        settings.features().len()
    );
    Ok(settings)
}

fn resolve(
    settings: &FeatureSettings,
    manifest: &FeatureManifest,
    config: &FeatureConfig,
) -> Result<()> {
    let arbiter = LoaderArbiter::new(config.loader_api_version);
    let plan = plan_build(settings, &manifest.plugins, &arbiter, config.openxr_enabled)?;

    println!(
        "Active loader: {}",
        plan.active_loader.as_deref().unwrap_or("default")
    );
    if let Some(name) = &plan.custom_loader_name {
        println!("Loader library: {name}");
    }
    println!("API version: {}", plan.api_version);
    for path in &plan.included {
        println!("+ {}", path.display());
    }
    for path in &plan.excluded {
        println!("- {}", path.display());
    }
    Ok(())
}

fn check(settings: &FeatureSettings) -> Result<()> {
    let issues = validate(settings);
    for issue in &issues {
        let severity = if issue.error { "error" } else { "warning" };
        match &issue.feature {
            Some(feature) => println!("{severity}: [{feature}] {}", issue.message),
            None => println!("{severity}: {}", issue.message),
        }
        if let Some(link) = &issue.help_link {
            println!("    see {link}");
        }
    }

    let errors = issues.iter().filter(|issue| issue.error).count();
    if errors > 0 {
        bail!("Validation failed with {errors} error(s)");
    }
    println!("Validation passed with {} warning(s)", issues.len());
    Ok(())
}
