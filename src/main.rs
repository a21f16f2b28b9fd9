use anyhow::Result;
use rulegate_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    rulegate::init_tracing(&config);

    rulegate::run(config).await
}
