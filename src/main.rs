//! pseudocored — sharded page cache and worker-pool paging runtime.

use clap::Parser;
use pseudocore::config::Config;
use pseudocore::supervisor::Supervisor;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pseudocored",
    about = "Sharded page cache and worker-pool paging runtime in front of a swap image"
)]
struct Args {
    /// Path to the backing swap image.
    #[arg(long, default_value = "./swap.img")]
    backing_path: String,

    /// Number of worker threads. Defaults to the detected core count.
    #[arg(long)]
    cores: Option<u32>,

    /// Size in MiB of each worker's addressable segment.
    #[arg(long, default_value_t = 64)]
    segment_mb: u64,

    /// Size in MiB of the ring log's circular buffer.
    #[arg(long, default_value_t = 16)]
    cache_mb: u64,

    /// Maximum number of live page-cache entries.
    #[arg(long, default_value_t = 4096)]
    max_cache_entries: usize,

    /// Run as a detached daemon instead of in the foreground.
    #[arg(long)]
    daemonize: bool,

    /// Pid-file path used when `--daemonize` is set.
    #[arg(long, default_value = "/var/run/pseudocored.pid")]
    pid_file: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut cfg = Config {
        backing_path: args.backing_path,
        segment_mb: args.segment_mb,
        cache_mb: args.cache_mb,
        max_cache_entries: args.max_cache_entries,
        pid_file: args.pid_file.clone(),
        ..Config::default()
    };
    if let Some(cores) = args.cores {
        cfg.cores = cores;
    }

    if args.daemonize {
        if let Err(e) = pseudocore::daemon::daemonize(&args.pid_file) {
            tracing::error!(error = %e, "daemonization failed");
            return ExitCode::FAILURE;
        }
    }

    let supervisor = match Supervisor::new(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match supervisor.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}
