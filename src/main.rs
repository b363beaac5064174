#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // `log` records from the library are bridged into this subscriber.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("testimonials_lib=info,tower_http=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = testimonials_lib::run().await {
        log::error!("Testimonials server failed: {}", e);
        std::process::exit(1);
    }
}
