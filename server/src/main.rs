use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use squadov_server::{LibraryConfig, LibraryState, server};
use std::io;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,squadov_server=debug".into()),
        )
        .init();

    // SQUADOV_VOD_DIR layout:
    //   - {id}.{ext}  (media files)
    //   - metadata/   ({id}.json documents)
    //   - thumbnails/
    //   - scratch/    (capture output before it is cataloged)
    let config = LibraryConfig::from_env().expect("Invalid SQUADOV_* configuration");

    let state = Arc::new(
        LibraryState::from_config(&config).expect("Failed to initialize VOD storage"),
    );

    let app = server::create_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listen address");
    info!(
        "SquadOV VOD server listening on http://{} (HTTP/1.1 + HTTP/2)",
        config.bind_addr
    );
    info!("Storage directory: {}", config.storage_dir.display());
    info!(
        "Identity: user={} device={}",
        config.identity.user_id, config.identity.device_id
    );

    // Use hyper's auto-negotiating server to support both HTTP/1.1 and HTTP/2
    let conn_builder = ConnBuilder::new(hyper_util::rt::TokioExecutor::new());

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!("New connection from: {}", addr);
        let io = TokioIo::new(stream);
        let app_clone = app.clone();
        let conn_builder = conn_builder.clone();

        tokio::spawn(async move {
            if let Err(err) = conn_builder
                .serve_connection_with_upgrades(
                    io,
                    hyper::service::service_fn(move |req| app_clone.clone().call(req)),
                )
                .await
            {
                // Peers hanging up mid-request are not worth an error
                let is_normal_close = err
                    .source()
                    .and_then(|e| e.downcast_ref::<io::Error>())
                    .map(|io_err| {
                        matches!(
                            io_err.kind(),
                            io::ErrorKind::ConnectionReset
                                | io::ErrorKind::BrokenPipe
                                | io::ErrorKind::UnexpectedEof
                        )
                    })
                    .unwrap_or(false);

                if is_normal_close {
                    debug!("Connection from {} closed normally", addr);
                } else {
                    error!("Error serving connection from {}: {}", addr, err);
                }
            } else {
                debug!("Connection from {} completed successfully", addr);
            }
        });
    }
}
