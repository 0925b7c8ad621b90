use std::sync::Arc;

use journey_feed::config::FeedConfig;
use journey_feed::external::Gateway;
use journey_feed::server::{serve, DynAPI};
use journey_feed::transport::PollingTransport;
use journey_feed::JourneyFeedClient;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match FeedConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let gateway = Gateway::new(config.gateway_url.clone());
    let transport = PollingTransport::new(gateway.clone(), config.poll_interval);
    let client = JourneyFeedClient::with_backoff(Arc::new(transport), config.backoff);
    let api = Arc::new(gateway) as DynAPI;

    if let Err(err) = serve(api, client.clone(), config.listen_addr).await {
        tracing::error!("{}", err);
    }

    client.dispose();
}
