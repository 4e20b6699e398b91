use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use k1s0_backoffice_server::adapter;
use k1s0_backoffice_server::domain;
use k1s0_backoffice_server::infrastructure;
use k1s0_backoffice_server::usecase;

use adapter::handler::{self, AppState};
use infrastructure::config::Config;
use infrastructure::event_bus::TableEventBus;
use infrastructure::persistence;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // 2. Telemetry
    infrastructure::telemetry::init_tracing(&cfg.log)?;
    info!(
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting {}",
        cfg.app.name
    );

    // 3. Database
    let db_pool = if let Some(ref db_cfg) = cfg.database {
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| db_cfg.connection_url());
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(db_cfg.max_connections)
            .connect(&url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database connected");
        Some(pool)
    } else {
        info!("running without database");
        None
    };

    // 4. Event bus + durable local store
    let event_bus = Arc::new(TableEventBus::default());
    let kv: Arc<dyn domain::repository::KeyValueStore> = match cfg.local_store.path {
        Some(ref path) => {
            info!(path = %path, "using file-backed local store");
            Arc::new(
                persistence::file_kv_store::FileKeyValueStore::open(path)?
                    .with_event_bus(event_bus.clone()),
            )
        }
        None => {
            info!("using in-memory local store");
            Arc::new(persistence::memory_kv_store::InMemoryKeyValueStore::with_event_bus(
                event_bus.clone(),
            ))
        }
    };

    // 5. Repositories
    let remote: Option<Arc<dyn domain::repository::RowStore>> = db_pool.as_ref().map(|pool| {
        Arc::new(persistence::remote_row_store::RemoteRowStore::new(pool.clone()))
            as Arc<dyn domain::repository::RowStore>
    });
    let local: Arc<dyn domain::repository::RowStore> =
        Arc::new(persistence::local_row_store::LocalRowStore::new(kv.clone()));
    let version_repo: Arc<dyn domain::repository::TableVersionRepository> =
        Arc::new(persistence::table_version_repo_impl::TableVersionKvRepository::new(kv.clone()));
    let change_repo: Arc<dyn domain::repository::ChangeRequestRepository> =
        if let Some(ref pool) = db_pool {
            Arc::new(persistence::change_request_repo_impl::ChangeRequestPostgresRepository::new(
                pool.clone(),
            ))
        } else {
            Arc::new(persistence::in_memory_change_request_repo::InMemoryChangeRequestRepository::new())
        };

    // 6. Use Cases
    let store = Arc::new(usecase::TableStore::new(
        cfg.bindings(),
        cfg.default_backend,
        remote,
        local,
        event_bus.clone(),
    ));
    let registry = Arc::new(usecase::SchemaRegistry::new(
        store.clone(),
        cfg.declared_schemas(),
        cfg.schema_cache.max_capacity,
    ));
    let views = Arc::new(usecase::TableViewRegistry::new());
    let versions_uc = Arc::new(usecase::VersionTrackingUseCase::new(
        version_repo,
        cfg.versioning.max_versions_per_table,
    ));
    let edit_table_uc = Arc::new(usecase::EditTableUseCase::new(
        registry.clone(),
        store.clone(),
        versions_uc.clone(),
    ));
    let list_rows_uc = Arc::new(usecase::ListRowsUseCase::new(
        registry.clone(),
        store.clone(),
        views.clone(),
    ));
    let change_approval_uc = Arc::new(usecase::ChangeApprovalUseCase::new(
        change_repo.clone(),
        edit_table_uc.clone(),
        event_bus.clone(),
    ));
    let notifications_uc = Arc::new(usecase::NotificationsUseCase::new(change_repo));

    // 7. Table watchers
    let watcher = usecase::WatchTableUseCase::new(store.clone(), views, event_bus);
    let watch_handles: Vec<_> = cfg
        .watched_tables()
        .iter()
        .map(|table_id| watcher.spawn(table_id))
        .collect();
    info!(count = watch_handles.len(), "table watchers started");

    // 8. AppState + Router
    let state = AppState {
        registry,
        list_rows_uc,
        edit_table_uc,
        versions_uc,
        change_approval_uc,
        notifications_uc,
        db_pool,
    };
    let app = handler::router(state);

    // 9. Start REST server
    let rest_addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server listening on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    for handle in watch_handles {
        handle.abort();
    }
    Ok(())
}
