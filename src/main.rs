use agentgate::cli::Args;
use agentgate::config::GatewayConfig;
use agentgate::console;
use agentgate::core::{MainThreadDispatcher, Simulation, VirtualInputDevice, WaypointStore};
use agentgate::demo::DemoScene;
use agentgate::paths::{self, PathConfig};
use agentgate::server::{ApiServer, EndpointRegistry, ListenPort, ServiceContext, default_services};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

fn init_logging(args: &Args, config: &GatewayConfig, path_config: &PathConfig) -> Result<()> {
    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file(paths::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(log_level)
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)));
        if config.debug_logging {
            builder.filter_module("agentgate", log::LevelFilter::Debug);
        }
        builder.init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
        builder
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis();
        if config.debug_logging {
            builder.filter_module("agentgate", log::LevelFilter::Debug);
        }
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // Settings first: debug_logging shapes the logger
    let config_path = paths::config_file(paths::CONFIG_FILE, &path_config);
    let first_run = !config_path.exists();
    let mut config = GatewayConfig::load(&config_path)?;
    config.apply_args(&args);

    init_logging(&args, &config, &path_config)?;

    info!("agentgate v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);
    info!("Config path: {}", config_path.display());
    if first_run {
        // Persist file values only, CLI overrides stay out of the file
        let defaults = GatewayConfig { debug_logging: config.debug_logging, ..Default::default() };
        match defaults.save(&config_path) {
            Ok(()) => info!("Wrote default config to {}", config_path.display()),
            Err(e) => warn!("Could not write default config: {:#}", e),
        }
    }

    // Scene
    let mut scene = DemoScene::new();
    if let Some(path) = &args.waypoints {
        scene.set_waypoints(DemoScene::load_waypoints(path)?);
    }

    let mut sim = Simulation::new(
        Box::new(scene),
        VirtualInputDevice::new(config.click_duration_secs),
        WaypointStore::new(config.waypoint_cache_ttl_secs),
    );
    let dispatcher = MainThreadDispatcher::<Simulation>::new();
    let ctx = ServiceContext::new(dispatcher.handle(), config.dispatch_timeout());

    // Gateway
    let listen_port = ListenPort::new(config.port);
    let registry = Arc::new(EndpointRegistry::with_services(default_services(&ctx, &listen_port)));
    let mut server = ApiServer::new(config.clone(), registry).with_listen_port(listen_port);
    if config.enabled {
        server.start()?;
        if let Some(url) = server.server_url() {
            println!("API server: {}", url);
        }
    } else {
        info!("API server disabled");
    }

    // Console
    let quit = Arc::new(AtomicBool::new(false));
    if !args.no_console {
        console::spawn_stdin_console(dispatcher.handle(), Arc::clone(&quit))
            .context("Failed to spawn console thread")?;
        println!("Type 'ocl_help' for console commands, 'quit' to exit");
    }

    // Fixed-step simulation loop on this thread
    let interval = config.tick_interval();
    let dt = interval.as_secs_f32();
    let mut next = Instant::now();
    info!("Simulation running at {} Hz", config.tick_rate_hz);
    loop {
        sim.tick(&dispatcher, dt);

        if quit.load(Ordering::SeqCst) {
            info!("Quit requested");
            break;
        }
        if let Some(limit) = args.ticks
            && sim.ticks() >= limit
        {
            info!("Reached {} ticks", limit);
            break;
        }

        next += interval;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else {
            // Behind schedule, do not try to catch up
            next = now;
        }
    }

    server.stop();
    // Run whatever was queued after the last tick so waiting handlers get answers
    dispatcher.drain(&mut sim);

    info!("Exiting after {} ticks ({:.2}s simulated)", sim.ticks(), sim.clock());
    Ok(())
}
