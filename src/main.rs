mod api;
mod app;
mod cache;
mod cli;
mod config;
mod db;
mod error;
mod feed;
mod models;
#[cfg(test)]
mod testing;

use app::App;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;

    let config = Config::load()?;
    let mut app = App::new(&config).await?;

    app.run(command).await
}
