use csv::{ReaderBuilder, Trim};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod atm;

/// The size of the channel for queuing requests.
const CHANNEL_SIZE: usize = 100;

/// Logs go to stderr so stdout carries only the receipts.
fn init_logging(config: &atm::AtmConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let args = std::env::args().collect::<Vec<_>>();
    if args.len() != 2 {
        eprintln!("Usage: {} <requests_csv_file>", args[0]);
        std::process::exit(1);
    }
    let input_file = &args[1];

    let config = atm::AtmConfig::from_env();
    init_logging(&config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }
    info!(
        min = config.min_amount,
        max = config.max_amount,
        step = config.step,
        "Starting ATM"
    );

    let (sender, receiver) = mpsc::channel(CHANNEL_SIZE);
    let mut state = atm::State::new(config, atm::AccountLedger::default(), receiver);

    let handle = tokio::spawn(async move {
        state.run().await;
        state
    });

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(input_file)
        .expect("Failed to read CSV file");

    for request in reader.deserialize() {
        match request {
            Ok(request) => {
                if let Err(err) = sender.send(request).await {
                    error!(error = %err, "Error sending request");
                }
            }
            Err(err) => warn!(error = %err, "Skipping malformed request"),
        }
    }

    drop(sender); // Close the sender to signal no more requests will be sent
    let state = handle
        .await
        .expect("Failed to join the state handling task");

    info!(till = ?state.get_dispenser().till().counts(), "Till after batch");

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for receipt in state.get_receipts() {
        if let Err(err) = writer.serialize(receipt) {
            error!(error = %err, "Error writing receipt");
        }
    }
    if let Err(err) = writer.flush() {
        error!(error = %err, "Error flushing receipts");
    }
}
