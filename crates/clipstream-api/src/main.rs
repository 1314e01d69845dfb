mod api_doc;
mod auth;
mod error;
mod handlers;
mod notify;
mod setup;
mod state;
mod telemetry;

use clipstream_core::Config;

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    // Stop claiming new jobs; in-flight jobs finish on their own.
    state.queue.shutdown().await;

    Ok(())
}
