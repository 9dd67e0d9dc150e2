use std::io::Write;
use std::sync::Arc;

use log::{error, info};
use simple_logger::SimpleLogger;
use statflow::cli::{describe_kinds, parse_args, Command, USAGE};
use statflow::engine::{Outcome, PipelineError, Progress};
use statflow::{build_orchestrator, load_dataset, open_cache, AppError, CONFIG};

#[tokio::main]
async fn main() {
    let config = &*CONFIG;
    if let Err(e) = SimpleLogger::new().with_level(config.log_level).init() {
        eprintln!("[statflow] logger: {e}");
    }
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(&args).await {
        Ok(code) => code,
        Err(AppError::Usage(msg)) => {
            eprintln!("{msg}\nUso: {USAGE}");
            2
        }
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(args: &[String]) -> Result<i32, AppError> {
    match parse_args(args)? {
        Command::Kinds => {
            for line in describe_kinds() {
                println!("{line}");
            }
            Ok(0)
        }
        Command::Clear => {
            open_cache(&CONFIG)?.clear()?;
            info!("cache cleared ({})", CONFIG.database.url);
            Ok(0)
        }
        Command::Run { kind, data, hash } => {
            let dataset = load_dataset(&data)?;
            let orchestrator = build_orchestrator(&CONFIG)?;
            let sink = Arc::new(move |p: &Progress| {
                eprint!("\r[{kind}] {:>5.1}%", p.progress * 100.0);
                let _ = std::io::stderr().flush();
            });
            let outcome = orchestrator.request(kind, &dataset, sink, hash.as_deref()).await?;
            eprintln!();
            match outcome {
                Outcome::Ready(artifact) => {
                    let payload = artifact
                        .to_payload()
                        .map_err(|e| PipelineError::Decode { kind, message: e.to_string() })?;
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                    Ok(0)
                }
                Outcome::CannotCompute(reason) => {
                    eprintln!("cannot compute {kind} for this dataset: {reason}");
                    Ok(4)
                }
                Outcome::Cancelled | Outcome::AlreadyComputing => {
                    eprintln!("{kind}: no result, try again");
                    Ok(4)
                }
            }
        }
    }
}
