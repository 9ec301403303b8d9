// src/main.rs

use devwatch::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status.code()),
        Err(err) => {
            eprintln!("devwatch error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<devwatch::ExitStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
