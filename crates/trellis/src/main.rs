mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::debug;
use tracing_subscriber::EnvFilter;

use trellis_core::extensibility::TypeRegistry;
use trellis_core::kernel::constants::DEFAULT_PLUGINS_DIR;
use trellis_core::{KernelError, Runtime, RuntimeSetup};

use cli::{CliArgs, Commands};

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
        return;
    }
    // The core crate logs through `log`.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records to tracing: {}", e);
    }
}

fn runtime_setup(args: &CliArgs) -> Result<RuntimeSetup, KernelError> {
    let mut setup = match &args.config {
        Some(path) => RuntimeSetup::load(path)?,
        None => RuntimeSetup::new(),
    };
    for path in &args.plugin_paths {
        setup = setup.with_plugin_directory(path.clone());
    }
    for constant in &args.defines {
        setup = setup.with_preprocessor_constant(constant.clone());
    }
    if args.no_cache {
        setup = setup.without_cache();
    }
    if let Some(directory) = &args.cache_dir {
        setup.cache.directory = Some(directory.clone());
    }
    if setup.plugin_directories.is_empty() {
        let default = PathBuf::from(DEFAULT_PLUGINS_DIR);
        if default.is_dir() {
            debug!("No plugin paths given, scanning '{}'", default.display());
            setup = setup.with_plugin_directory(default);
        }
    }
    Ok(setup)
}

fn list(runtime: &Runtime) {
    let registry = runtime.registry();
    let services = registry.services().all();
    let components = registry.components().all();
    for plugin in registry.plugins().all() {
        match plugin.disabled_reason() {
            Some(reason) => println!("{} (disabled: {})", plugin.plugin_id(), reason),
            None => println!("{}", plugin.plugin_id()),
        }
        for service in services
            .iter()
            .filter(|service| service.plugin().plugin_id() == plugin.plugin_id())
        {
            println!("  service {}: {}", service.service_id(), service.service_type_name());
        }
        for component in components
            .iter()
            .filter(|component| component.plugin().plugin_id() == plugin.plugin_id())
        {
            println!(
                "  component {} -> {}: {}",
                component.component_id(),
                component.service().service_id(),
                component.component_type_name()
            );
        }
    }
    if let Some(report) = runtime.report() {
        for rejected in &report.rejected {
            println!("{} (rejected: {})", rejected.plugin_id, rejected.error);
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode, KernelError> {
    let setup = runtime_setup(&args)?;
    let mut runtime = Runtime::new(setup, Arc::new(TypeRegistry::new()));
    runtime.initialize()?;

    match args.command {
        Commands::List => {
            list(&runtime);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify => {
            if runtime.verify_installation() {
                println!("Installation verified.");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Installation has errors.");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
