/*****************************************************************************************
 *
 *  stampd – begin/finish time-stamp recorder
 *  ------------------------------------------
 *
 *  Load snapshot → serve /stamp and /list → drain → save snapshot
 *
 *****************************************************************************************/

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task;

use stampd::config::AppConfig;
use stampd::persistence::{autosave_loop, load_snapshot, save_store};
use stampd::state::{AppState, StampStore};
use stampd::{app, logging, server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = AppConfig::parse();

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging (stdout + request log file)
    // ────────────────────────────────────────────────────────
    //
    std::fs::create_dir_all(&cfg.log_path)?;
    let _log_guard = logging::init(&cfg.log_level, &cfg.request_log_path())?;

    tracing::info!("Starting stampd…");
    tracing::info!("Loaded configuration: {:?}", cfg);

    //
    // ────────────────────────────────────────────────────────
    //  Load snapshot; a corrupt file aborts startup
    // ────────────────────────────────────────────────────────
    //
    let db_path = cfg.db_path();
    let stamps = load_snapshot(&db_path).inspect_err(|e| {
        tracing::error!("{e}; refusing to start with an incomplete store");
    })?;
    let store = StampStore::from_snapshot(stamps);

    //
    // ────────────────────────────────────────────────────────
    //  Start autosave loop (optional)
    // ────────────────────────────────────────────────────────
    //
    let (autosave_stop, autosave_stop_rx) = watch::channel(false);
    let autosave = cfg.snapshot_interval().map(|every| {
        tracing::info!("Starting autosave loop: interval={}s", every.as_secs());
        task::spawn(autosave_loop(
            db_path.clone(),
            store.clone(),
            every,
            autosave_stop_rx,
        ))
    });

    //
    // ────────────────────────────────────────────────────────
    //  Bind, serve, drain on SIGINT/SIGTERM
    // ────────────────────────────────────────────────────────
    //
    let state = AppState::new(store.clone(), cfg.utc_offset);
    let app = app::build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = server::run(
        listener,
        app,
        store.clone(),
        cfg.shutdown_grace(),
        server::shutdown_signal(),
    )
    .await
    {
        tracing::error!("Server error: {e}");
    }

    //
    // ────────────────────────────────────────────────────────
    //  Persist; a failed save is logged, not fatal
    // ────────────────────────────────────────────────────────
    //
    store.stop_accepting();
    // Wait out an in-progress checkpoint so it cannot land after the final save.
    let _ = autosave_stop.send(true);
    if let Some(handle) = autosave {
        if let Err(e) = handle.await {
            tracing::warn!("Autosave task ended abnormally: {e}");
        }
    }
    match save_store(&db_path, &store) {
        Ok(()) => tracing::info!("Snapshot saved. Goodbye."),
        Err(e) => tracing::error!("{e}; stamps recorded since the last save are lost"),
    }

    Ok(())
}
