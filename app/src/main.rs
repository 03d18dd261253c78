use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sigmakit")]
#[command(about = "Plan batched Ergo token distributions as EIP-12 unsigned transactions")]
#[command(version)]
struct Args {
    /// Distribution plan (JSON)
    plan: PathBuf,

    /// Config file (JSON), defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    sigmakit_lib::init_tracing();

    match sigmakit_lib::run(&args.plan, args.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
