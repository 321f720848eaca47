// src/main.rs

use jobctl::errors::JobError;
use jobctl::types::JobExitCode;
use jobctl::{cli, logging, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(exit) => exit.code(),
        Err(err) => {
            let is_config = err
                .downcast_ref::<JobError>()
                .is_some_and(JobError::is_configuration);
            if is_config {
                eprintln!("jobctl configuration error: {err:?}");
            } else {
                eprintln!("jobctl error: {err:?}");
            }
            JobExitCode::InternalError.code()
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<JobExitCode> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
