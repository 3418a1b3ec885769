use std::sync::Arc;

use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::LevelFilter;

use crewnest::{config::Config, db::db::DBClient, service::queue::TaskWorker, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = if let Some(ref redis_url) = config.redis_url {
        match DBClient::with_redis(pool.clone(), redis_url).await {
            Ok(client) => {
                if client.is_redis_available() {
                    println!("✅ Redis broker connected - queue consumers are live");
                } else {
                    println!("⚠️  Redis connection failed - consumers will idle until it returns");
                }
                client
            }
            Err(e) => {
                println!("⚠️  Redis initialization error: {} - consumers will idle", e);
                DBClient::new(pool)
            }
        }
    } else {
        println!("ℹ️  REDIS_URL not set - consumers will idle until the broker is configured");
        DBClient::new(pool)
    };

    let app_state = Arc::new(AppState::new(db_client, config));
    let dispatcher = app_state.task_dispatcher();

    println!(
        "🚀 Matching-core worker is running (broker: {}, queues: {}, {})",
        app_state.db_client.broker_status(),
        app_state.reliability_queue.prefix(),
        app_state.reminder_queue.prefix(),
    );

    let reliability_worker =
        TaskWorker::new(app_state.reliability_queue.clone(), dispatcher.clone());
    let reminder_worker = TaskWorker::new(app_state.reminder_queue.clone(), dispatcher);

    let reliability_handle = tokio::spawn(async move {
        reliability_worker
            .run_forever(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
    });

    let reminder_handle = tokio::spawn(async move {
        reminder_worker
            .run_forever(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
    });

    let _ = tokio::join!(reliability_handle, reminder_handle);
}
