use postbox::app;
use postbox::config::Config;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(config.verbose);

    if let Err(err) = app::run(config).await {
        error!(error = %err, "consumer terminated with error");
        std::process::exit(1);
    }
}
