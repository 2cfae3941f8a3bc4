use abp_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = abp_api::setup::initialize_app(config.clone()).await?;

    abp_api::setup::server::start_server(&config, router, state).await?;

    Ok(())
}
