//! Saga node entry point.

use domain::Money;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use saga_node::{AppError, Config, LogFormat, System};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .map_err(|e| AppError::Logging(e.to_string()))
}

/// Installs the Prometheus recorder.
///
/// With `METRICS_ADDR` set, metrics are served over HTTP and no handle is
/// returned.
fn init_metrics(config: &Config) -> Result<Option<PrometheusHandle>, AppError> {
    let builder = PrometheusBuilder::new();
    match config.metrics_addr {
        Some(addr) => {
            builder.with_http_listener(addr).install()?;
            tracing::info!(%addr, "serving Prometheus metrics");
            Ok(None)
        }
        None => Ok(Some(builder.install_recorder()?)),
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

/// Runs one order and one payment through each outcome.
async fn run_demo_flows(system: &System) -> Result<(), AppError> {
    let config = system.config();
    let over_card_limit = Money::new(config.card_approval_limit.amount().saturating_add(1));
    let over_foreign_limit = Money::new(config.foreign_approval_limit.amount().saturating_add(1));

    for (card, coupon) in [
        (Money::new(5000), Money::new(3000)),
        (over_card_limit, Money::new(3000)),
    ] {
        let (order_id, saga) = system.place_order("P-100", 2, card, coupon).await?;
        tracing::info!(
            %order_id,
            state = %saga.state(),
            compensated = ?saga.compensated_steps(),
            reason = saga.failure_reason().unwrap_or("-"),
            "order saga finished"
        );
    }

    for amount in [Money::new(800), over_foreign_limit] {
        let (payment_id, saga) = system.request_payment("user-1", amount, "EUR").await?;
        let payment = system.payments().get_payment(payment_id).await?;
        tracing::info!(
            %payment_id,
            state = %saga.state(),
            payment_status = ?payment.map(|p| p.status()),
            "payment saga finished"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Configuration, logging, metrics
    let config = Config::from_env();
    init_tracing(&config)?;
    let metrics_handle = init_metrics(&config)?;

    // 2. Wire the node and catch up on stored triggers
    let system = System::start(config.clone()).await?;

    // 3. Drive the demo flows through the live event feed
    run_demo_flows(&system).await?;

    if let Some(handle) = metrics_handle {
        tracing::debug!(metrics = %handle.render(), "metrics snapshot");
    } else {
        shutdown_signal().await;
    }

    system.shutdown();
    Ok(())
}
