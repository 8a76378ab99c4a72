use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use gatescope_bridge::{net, CallbackServer, SimClient};
use gatescope_inspector::server::{router, run_view, InspectorState};
use gatescope_inspector::{GraphModel, HierarchyView};
use gatescope_protocol::{ConnectRequest, VizRequest, ROOT_SCOPE};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gatescope-inspector")]
#[command(about = "Web inspector for a running gatescope simulation")]
struct Cli {
    /// Address of the simulator control port
    #[arg(long, default_value = "localhost")]
    sim_ip: String,

    #[arg(long, default_value_t = 8888)]
    sim_port: u16,

    /// Debug database handed to the simulator on connect
    #[arg(long)]
    database: PathBuf,

    /// TCP address to bind the web server
    #[arg(long, default_value = "0.0.0.0:8090")]
    bind: SocketAddr,

    /// Directory containing frontend assets
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatescope_inspector=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let client = Arc::new(SimClient::new(&cli.sim_ip, cli.sim_port));
    let (sim_tx, sim_rx) = mpsc::unbounded_channel();
    let callback = match CallbackServer::spawn(sim_tx).await {
        Ok(callback) => callback,
        Err(err) => {
            error!("failed to start callback listener: {err}");
            std::process::exit(1);
        }
    };

    let ip = match net::routable_ip(&cli.sim_ip) {
        Ok(ip) => ip.to_string(),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };
    let connect = ConnectRequest {
        ip,
        port: callback.port(),
        database: cli.database.display().to_string(),
        src_path: None,
        dst_path: None,
    };
    if let Err(err) = client.connect(&connect).await {
        error!("cannot reach simulator at {}: {err}", client.base());
        std::process::exit(1);
    }
    info!("connected to simulator at {}", client.base());

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, _) = broadcast::channel(256);
    let state = InspectorState {
        requests: request_tx.clone(),
        updates: broadcast_tx,
        graph: Arc::new(Mutex::new(GraphModel::default())),
    };

    let view = HierarchyView::new(client, update_tx);
    tokio::spawn(run_view(view, request_rx, update_rx, sim_rx, state.clone()));

    // Seed the view with the design root, like a freshly opened panel.
    let _ = request_tx.send(VizRequest::Hierarchy(ROOT_SCOPE.to_string()));

    let static_dir = cli
        .static_dir
        .unwrap_or_else(|| PathBuf::from("crates/gatescope-inspector/static"));
    info!("serving static files from {}", static_dir.display());

    let app = router(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http());

    let listener = match TcpListener::bind(cli.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {err}", cli.bind);
            std::process::exit(1);
        }
    };

    info!("gatescope inspector: http://{}", cli.bind);

    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
    }
}
