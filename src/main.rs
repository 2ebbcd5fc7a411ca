use anyhow::Context;
use sqs_runner::{health, lifecycle, sqs, Consumer, Dispatcher, Settings, SqsReceiver};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_line_number(true)
        .init();

    let settings = Settings::from_env().context("failed to load configuration")?;

    let token = CancellationToken::new();
    let signal_listener = lifecycle::cancel_on_shutdown_signal(token.clone());

    let health_token = token.clone();
    let health_addr = settings.health_addr;
    let health_server = tokio::spawn(async move {
        let result = health::serve(health_addr, health_token.clone()).await;
        if result.is_err() {
            health_token.cancel();
        }
        result
    });

    let client = sqs::build_client(&settings).await;
    let receiver = SqsReceiver::new(client, settings.queue_url.clone());
    tracing::info!(
        queue_url = receiver.queue_url(),
        region = %settings.region,
        "initialized sqs receiver"
    );

    let consumer = Consumer::new(
        receiver,
        Dispatcher::with_default_handlers(),
        settings.consumer_config(),
    );
    consumer.run(token.clone()).await?;

    token.cancel();
    health_server.await.context("health check task panicked")??;
    signal_listener.await.context("signal listener panicked")?;

    tracing::info!("sqs consumer stopped");
    Ok(())
}
