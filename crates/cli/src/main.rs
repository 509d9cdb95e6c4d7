mod render;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    bazaar_marketplace::{
        CatalogView, FieldUpdate, InstallOutcome, Marketplace, MarketplaceError, Navigator,
        PluginId, StaticIdentity, WorkflowPhase,
    },
    clap::{Parser, Subcommand},
    secrecy::SecretString,
    tracing::{debug, info, warn},
    tracing_subscriber::EnvFilter,
};

const DEFAULT_LOG_FILTER: &str = "bazaar=info,bazaar_marketplace=info,bazaar_config=info";

#[derive(Parser)]
#[command(name = "bazaar", version, about = "Browse and install marketplace plugins")]
struct Cli {
    /// Path to bazaar.toml (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace (organization) to install into.
    #[arg(long, global = true, env = "BAZAAR_WORKSPACE")]
    workspace: Option<String>,

    /// Bearer token for the organizations service and install endpoints.
    #[arg(long, global = true, env = "BAZAAR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, global = true, env = "BAZAAR_USER_ID")]
    user_id: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the catalog and print one page of a view.
    List {
        #[arg(long, default_value_t = CatalogView::All)]
        view: CatalogView,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Print a plugin's detail record.
    Show { plugin_id: String },
    /// Install a plugin into the workspace and follow its redirect.
    Install {
        plugin_id: String,
        /// Open the redirect target in a browser when it is an absolute URL.
        #[arg(long)]
        open: bool,
    },
}

/// Navigates by printing the target, optionally handing it to the browser.
struct TerminalNavigator {
    open: bool,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, url: &str) {
        println!("Redirecting to {url}");
        if !self.open || !(url.starts_with("https://") || url.starts_with("http://")) {
            return;
        }
        if let Err(e) = open::that(url) {
            warn!(error = %e, %url, "failed to open browser");
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    #[cfg(feature = "metrics")]
    let metrics = bazaar_metrics::install_prometheus()?;

    let mut config = bazaar_config::load_config(cli.config.as_deref())?;
    if let Some(workspace) = cli.workspace {
        config.session.workspace_id = Some(workspace);
    }
    if let Some(token) = cli.token {
        config.session.auth_token = Some(SecretString::new(token));
    }

    let navigator = Arc::new(TerminalNavigator {
        open: matches!(cli.command, Commands::Install { open: true, .. }),
    });
    let market = Marketplace::from_config(&config, navigator)
        .context("failed to set up marketplace client")?;

    if let Some(user_id) = cli.user_id {
        market.resolve_user(&StaticIdentity::user(user_id)).await;
    }

    let result = match cli.command {
        Commands::List { view, page } => list(&market, view, page).await,
        Commands::Show { plugin_id } => show(&market, PluginId::new(plugin_id)).await,
        Commands::Install { plugin_id, .. } => install(&market, PluginId::new(plugin_id)).await,
    };
    market.teardown().await;

    #[cfg(feature = "metrics")]
    eprintln!("{}", metrics.render());

    result
}

async fn list(market: &Marketplace, view: CatalogView, page: usize) -> Result<()> {
    let report = market
        .refresh_catalog()
        .await
        .context("could not reach the marketplace")?;
    if let FieldUpdate::Kept(reason) = report.get(view) {
        warn!(%view, ?reason, "showing possibly outdated listing");
    }

    market.go_to_page(view, page.saturating_sub(1)).await;
    let page = market.page(view).await;
    print!("{}", render::catalog_page(&page));
    Ok(())
}

async fn show(market: &Marketplace, plugin_id: PluginId) -> Result<()> {
    let view = market.select(Some(plugin_id)).await?;
    match view.plugin {
        Some(plugin) if view.phase == WorkflowPhase::Ready => {
            print!("{}", render::plugin_detail(&plugin));
            Ok(())
        },
        _ => bail!("{}", view.outcome.message()),
    }
}

async fn install(market: &Marketplace, plugin_id: PluginId) -> Result<()> {
    let view = market.select(Some(plugin_id.clone())).await?;
    if view.phase != WorkflowPhase::Ready {
        bail!("{}", view.outcome.message());
    }

    let outcome = match market.install().await {
        Ok(outcome) => outcome,
        Err(MarketplaceError::MissingSession) => {
            bail!("{} (pass --workspace and --token)", MarketplaceError::MissingSession)
        },
        Err(e) => return Err(e.into()),
    };

    match outcome {
        InstallOutcome::Success { message, .. } => {
            println!("{message}");
            info!(%plugin_id, "waiting for redirect");
            if !market.wait_for_redirect().await {
                debug!("no redirect fired");
            }
            Ok(())
        },
        InstallOutcome::Failure { message } => bail!("{message}"),
        InstallOutcome::Pending { .. } => bail!("install did not complete"),
    }
}
