use dotenvy::dotenv;
use log::info;
use payin_worker::{cli::handle_command_line_args, config::WorkerConfig, worker::run_worker};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    handle_command_line_args();
    let config = WorkerConfig::from_env_or_default();

    info!("🚀️ Starting capture reconciliation worker");
    match run_worker(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
