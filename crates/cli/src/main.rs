mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use runner::{run_detect, run_direct, run_scan, DetectArgs, DirectArgs, ScanArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            target,
            wordlist,
            methods,
            threads,
            timeout,
            connect_timeout,
            deadline,
            no_patterns,
            no_brute,
            fuzz_versions,
            max_version,
            method_limit,
            tls,
            strict,
            simple,
            json,
            output,
        } => {
            run_scan(ScanArgs {
                target,
                wordlist,
                methods,
                threads,
                timeout,
                connect_timeout,
                deadline,
                no_patterns,
                no_brute,
                fuzz_versions,
                max_version,
                method_limit,
                tls,
                strict,
                simple,
                json,
                output,
            })
            .await?;
        }
        Commands::Direct {
            target,
            call,
            service,
            method,
            timeout,
            tls,
            strict,
            json,
        } => {
            run_direct(DirectArgs {
                target,
                call,
                service,
                method,
                timeout,
                tls,
                strict,
                json,
            })
            .await?;
        }
        Commands::Detect {
            target,
            targets,
            threads,
            timeout,
            tls,
            json,
            output,
        } => {
            run_detect(DetectArgs {
                target,
                targets,
                threads,
                timeout,
                tls,
                json,
                output,
                verbose: cli.verbose > 0,
            })
            .await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
