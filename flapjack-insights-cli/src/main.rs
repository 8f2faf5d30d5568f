mod client;

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flapjack_insights::memory::{InMemorySearchClient, InMemorySearchInstance};
use flapjack_insights::middleware::{AnonymousTokenStore, CookieTokenStore, NoAnonymousToken};
use flapjack_insights::{
    InsightsError, InsightsEvent, InsightsInitParams, InsightsMiddleware, InsightsMiddlewareConfig, Middleware,
    SearchParameters,
};

use crate::client::StdoutInsightsClient;

#[derive(Parser)]
#[command(name = "flapjack-insights")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "FLAPJACK_APP_ID")]
    app_id: Option<String>,
    #[arg(long, env = "FLAPJACK_API_KEY")]
    api_key: Option<String>,
    /// Token the insights client reports from `getUserToken`
    #[arg(long)]
    user_token: Option<String>,
    /// Token left in the client's pre-load queue by a `setUserToken` call
    #[arg(long)]
    queued_token: Option<String>,
    /// Cookie header to look the anonymous token up in
    #[arg(long, env = "FLAPJACK_INSIGHTS_COOKIE")]
    cookie: Option<String>,
    /// Run with the insights client disabled
    #[arg(long)]
    disabled: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Send a JSON array of widget events through the middleware
    Replay { file: PathBuf },
}

fn load_events(path: &Path) -> Result<Vec<InsightsEvent>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let events = serde_json::from_str(&contents)
        .map_err(|e| format!("invalid events file {}: {}", path.display(), e))?;
    Ok(events)
}

fn run_replay(cli: &Cli, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let events = load_events(file)?;

    let anonymous: Arc<dyn AnonymousTokenStore> = match cli.cookie {
        Some(ref header) => Arc::new(CookieTokenStore::new(header.clone())),
        None => Arc::new(NoAnonymousToken),
    };

    let config = (if cli.disabled {
        InsightsMiddlewareConfig::disabled()
    } else {
        let client = StdoutInsightsClient::new(
            cli.user_token.clone(),
            cli.queued_token.clone(),
            anonymous.anonymous_user_token(),
        );
        InsightsMiddlewareConfig::new(Arc::new(client))
    })
    .with_init_params(InsightsInitParams::from_env())
    .with_anonymous_tokens(anonymous);

    let search_client = InMemorySearchClient {
        app_id: cli.app_id.clone(),
        api_key: cli.api_key.clone(),
        headers: None,
    };
    let instance = Arc::new(InMemorySearchInstance::with_session(
        Arc::new(search_client),
        SearchParameters::default(),
    ));

    let mut middleware = InsightsMiddleware::new(config, instance.clone())?;
    middleware.started()?;

    let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
    for event in &events {
        let outcome = instance.send_event_to_insights(event);
        *outcomes.entry(format!("{:?}", outcome)).or_default() += 1;
    }

    middleware.unsubscribe();

    eprintln!("Replayed {} events", events.len());
    for (outcome, count) in &outcomes {
        eprintln!("  {}: {}", outcome, count);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Command::Replay { ref file } => run_replay(&cli, file),
    };

    if let Err(e) = result {
        match e.downcast_ref::<InsightsError>() {
            Some(err) => eprintln!("ERROR [{}]: {}", err.code(), err),
            None => eprintln!("ERROR: {}", e),
        }
        std::process::exit(1);
    }
}
