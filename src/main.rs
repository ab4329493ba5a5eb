use std::sync::Arc;
use tracing::info;
use webhook_relay::application::context::AppContext;
use webhook_relay::application::usecases::cleanup_deliveries::CleanupDeliveriesUseCase;
use webhook_relay::application::usecases::delivery_worker::DeliveryWorkerPool;
use webhook_relay::application::usecases::requeue_stale_attempts::RequeueStaleAttemptsUseCase;
use webhook_relay::config;
use webhook_relay::infrastructure::db::postgres::PostgresDatabase;
use webhook_relay::infrastructure::db::repositories::Repositories;
use webhook_relay::infrastructure::http::ReqwestTransport;
use webhook_relay::infrastructure::queue::InProcessQueue;
use webhook_relay::interface::http;
use webhook_relay::interface::http::state::AppState;
use webhook_relay::observability;

#[tokio::main]
async fn main() {
    // Step 1: Load configuration and start logging/metrics.
    let settings = config::load().expect("load config");
    observability::init_tracing(&settings.observability);
    let metrics = observability::init_metrics(&settings.observability).expect("init metrics");

    // Step 2: Pick the storage backend. An empty URL means in-memory stores.
    let repos = if settings.db.url.is_empty() {
        info!("using in-memory stores");
        Repositories::in_memory()
    } else {
        let db = Arc::new(
            PostgresDatabase::connect(&settings.db)
                .await
                .expect("connect database"),
        );
        db.apply_schema().await.expect("apply schema");
        Repositories::postgres(db)
    };

    // Step 3: Assemble the queue, the outbound client and the shared context.
    let delivery = &settings.webhook_delivery;
    let (queue, receiver) = InProcessQueue::new();
    let transport = ReqwestTransport::new(&delivery.user_agent).expect("build http client");
    let ctx = Arc::new(AppContext::new(
        repos,
        settings.clone(),
        Arc::new(queue),
        Arc::new(transport),
    ));

    // Step 4: Start workers and maintenance loops.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut tasks =
        DeliveryWorkerPool::new(ctx.clone(), receiver, delivery.worker_count).start(shutdown_rx.clone());
    {
        let ctx = ctx.clone();
        let shutdown = shutdown_rx.clone();
        let interval = time::Duration::milliseconds(delivery.requeue_interval_ms as i64);
        let limit = delivery.requeue_batch_size;
        tasks.push(tokio::spawn(async move {
            let _ = RequeueStaleAttemptsUseCase::run_loop(&ctx, interval, limit, shutdown).await;
        }));
    }
    {
        let ctx = ctx.clone();
        let shutdown = shutdown_rx.clone();
        let interval = time::Duration::milliseconds(delivery.cleanup_interval_ms as i64);
        tasks.push(tokio::spawn(async move {
            let _ = CleanupDeliveriesUseCase::run_loop(&ctx, interval, shutdown).await;
        }));
    }

    // Step 5: Bind and serve until ctrl-c.
    let app = http::app(AppState {
        ctx: ctx.clone(),
        metrics,
    });
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("bind server");
    info!(addr = %bind_addr, "webhook_relay_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("serve");

    // Step 6: Stop background tasks.
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    info!("webhook_relay_stopped");
}
