use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use minter_keeper::{
    api::{DexScreenerClient, HttpCoSigner, PiteasClient},
    burn::{BurnSettings, BuyAndBurnOrchestrator, burn_window},
    chain::{ChainReader, EthersChain, EthersSubmitter, TxSubmitter},
    config::AppConfig,
    mint::{MintOrchestrator, MintPhase, MintSettings},
    panel::TokenInputPanel,
    poller::PollerSet,
    readers::{loaded, spawn_burn_readers, spawn_mint_readers},
    state::{AppState, ConversionRule},
    utils,
    wallet::WalletConnector,
};
use std::sync::Arc;
use std::time::Duration;

/// How long startup waits for the first reads.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// How long `mint` waits for the allowance poll to reflect an approval.
const ALLOWANCE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Parser)]
#[command(name = "minter-keeper", version, about = "Mint and buy-and-burn keeper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print balances, prices and buy-and-burn statistics once.
    Status,
    /// Keep the readers running and log a summary periodically.
    Watch {
        #[arg(long, default_value_t = 30)]
        heartbeat_secs: u64,
    },
    /// Approve if needed, then mint.
    Mint {
        /// Send-token amount as a decimal.
        #[arg(long, conflicts_with = "max")]
        amount: Option<String>,
        /// Use the whole send-token balance.
        #[arg(long)]
        max: bool,
    },
    /// Run the buy-and-burn pipeline once.
    Burn,
}

struct App {
    config: AppConfig,
    state: Arc<AppState>,
    chain: Arc<EthersChain>,
    http: reqwest::Client,
    wallet: WalletConnector,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let state = Arc::new(AppState::new());
        let chain = Arc::new(EthersChain::new(&config.rpc_url)?);
        let mut wallet = WalletConnector::new(config.chain_id, state.wallet.clone());
        if let Some(key) = &config.private_key {
            wallet.connect(key).context("PRIVATE_KEY is not a valid key")?;
        }
        Ok(Self {
            config,
            state,
            chain,
            http: reqwest::Client::new(),
            wallet,
        })
    }

    fn submitter(&self) -> Result<Arc<dyn TxSubmitter>> {
        let Some(signer) = self.wallet.signer() else {
            bail!("Set PRIVATE_KEY env var to submit transactions");
        };
        let provider = (*self.chain.provider()).clone();
        Ok(Arc::new(EthersSubmitter::new(provider, signer)))
    }

    fn co_signer(&self) -> Arc<HttpCoSigner> {
        Arc::new(HttpCoSigner::new(
            self.http.clone(),
            self.config.burn_signer_url.clone(),
            self.config.mint_signer_url.clone(),
        ))
    }

    fn panel(&self) -> TokenInputPanel {
        TokenInputPanel::new(
            self.state.clone(),
            ConversionRule::for_variant(self.config.mint_variant),
            self.config.symbols.clone(),
        )
    }

    fn burn_orchestrator(
        &self,
        submitter: Arc<dyn TxSubmitter>,
    ) -> Result<BuyAndBurnOrchestrator> {
        let quotes = PiteasClient::new(
            self.http.clone(),
            &self.config.quote_api_url,
            self.config.quote_referer.clone(),
        )?;
        Ok(BuyAndBurnOrchestrator::new(
            BurnSettings::from_config(&self.config),
            self.state.clone(),
            Arc::new(quotes),
            self.co_signer(),
            submitter,
        ))
    }

    fn mint_readers(&self) -> Result<PollerSet> {
        let prices = DexScreenerClient::new(self.http.clone(), &self.config.price_api_url)?;
        Ok(spawn_mint_readers(
            &self.config,
            self.chain.clone(),
            Arc::new(prices),
            self.state.clone(),
        ))
    }

    async fn wait_for_mint_data(&self) {
        let mint = &self.state.mint;
        let _ = futures::join!(
            loaded(&mint.send_balance, LOAD_TIMEOUT),
            loaded(&mint.allowance, LOAD_TIMEOUT),
            loaded(&mint.send_quote, LOAD_TIMEOUT),
            loaded(&mint.native_quote, LOAD_TIMEOUT),
        );
    }

    async fn wait_for_burn_data(&self) {
        let burn = &self.state.burn;
        let _ = futures::join!(
            loaded(&burn.native_balance, LOAD_TIMEOUT),
            loaded(&burn.last_burn_time, LOAD_TIMEOUT),
            loaded(&burn.burn_interval, LOAD_TIMEOUT),
        );
    }

    fn print_links(&self) {
        let links = &self.config.links;
        for (name, url) in [
            ("Twitter", &links.twitter),
            ("Telegram", &links.telegram),
            ("Disclaimer", &links.disclaimer),
            ("Explorer", &links.explorer),
        ] {
            if let Some(url) = url {
                println!("{name}: {url}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    tracing::info!(
        mint_variant = ?config.mint_variant,
        burn_variant = ?config.burn_variant,
        chain_id = config.chain_id,
        "[INIT] minter-keeper starting"
    );
    let app = App::new(config)?;

    match cli.command {
        Command::Status => status(&app).await,
        Command::Watch { heartbeat_secs } => watch(&app, heartbeat_secs).await,
        Command::Mint { amount, max } => mint(&app, amount, max).await,
        Command::Burn => burn(&app).await,
    }
}

async fn status(app: &App) -> Result<()> {
    let mint_readers = app.mint_readers()?;
    let burn_readers = spawn_burn_readers(&app.config, app.chain.clone(), app.state.clone());
    match app.chain.chain_id().await {
        Ok(id) if id != app.config.chain_id => {
            tracing::warn!(rpc = id, configured = app.config.chain_id, "[INIT] chain id mismatch")
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "[INIT] chain id unavailable"),
    }
    let (_, _, receive_supply) = futures::join!(
        app.wait_for_mint_data(),
        app.wait_for_burn_data(),
        app.chain.total_supply(app.config.minter),
    );

    println!("Wallet: {}", app.wallet.label());
    println!("{}", app.panel().view());
    match receive_supply {
        Ok(supply) => println!(
            "{} supply: {}",
            app.config.symbols.receive,
            utils::whole_units(supply, 18)
        ),
        Err(e) => tracing::warn!(error = %e, "[STATUS] supply read failed"),
    }
    let burn = BurnSettings::from_config(&app.config);
    println!("{}", burn.stats(&app.state));
    app.print_links();

    mint_readers.shutdown();
    burn_readers.shutdown();
    Ok(())
}

async fn watch(app: &App, heartbeat_secs: u64) -> Result<()> {
    let mut readers = app.mint_readers()?;
    readers.extend(spawn_burn_readers(
        &app.config,
        app.chain.clone(),
        app.state.clone(),
    ));
    let burn = BurnSettings::from_config(&app.config);
    tracing::info!(pollers = readers.len(), "[INIT] watching");

    let mut ticker = tokio::time::interval(Duration::from_secs(heartbeat_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = burn.stats(&app.state);
                let next_burn = burn_window(&app.state)
                    .map(|w| w.remaining_secs_at(utils::now_ms()));
                tracing::info!(
                    supply = ?stats.supply,
                    burnt = ?stats.burnt,
                    native_balance = ?stats.native_balance,
                    next_burn_in_secs = ?next_burn,
                    "[HEARTBEAT] buy-and-burn"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[SHUTDOWN] stopping readers");
                break;
            }
        }
    }
    readers.shutdown();
    Ok(())
}

async fn mint(app: &App, amount: Option<String>, max: bool) -> Result<()> {
    let submitter = app.submitter()?;
    let readers = app.mint_readers()?;
    app.wait_for_mint_data().await;

    let panel = app.panel();
    if max {
        if panel.set_max().is_none() {
            bail!("send-token balance not loaded");
        }
    } else {
        let Some(raw) = amount else {
            bail!("pass --amount or --max");
        };
        panel.set_input(&raw);
    }
    println!("{}", panel.view());

    let orchestrator = Arc::new(MintOrchestrator::new(
        MintSettings::from_config(&app.config),
        app.state.clone(),
        submitter,
        app.co_signer(),
    ));
    let tracker = orchestrator.track_phase();
    let symbols = &app.config.symbols;
    let phase = orchestrator.refresh_phase();
    if let Some(allowance) = orchestrator.allowance() {
        tracing::info!(
            amount = %allowance.amount,
            spender = ?allowance.spender,
            "[MINT] current allowance"
        );
    }
    println!("{}", phase.label(&symbols.send, &symbols.receive));

    let outcome = if phase == MintPhase::NeedsAllowance {
        orchestrator.execute().await?;
        let mut phase = app.state.mint.phase.subscribe();
        tokio::time::timeout(
            ALLOWANCE_TIMEOUT,
            phase.wait_for(|p| *p == MintPhase::Mintable),
        )
        .await
        .context("allowance poll did not reflect the approval")??;
        orchestrator.execute().await?
    } else {
        orchestrator.execute().await?
    };
    println!("Minted in {:?}", outcome.hash);

    drop(tracker);
    readers.shutdown();
    Ok(())
}

async fn burn(app: &App) -> Result<()> {
    let submitter = app.submitter()?;
    let readers = spawn_burn_readers(&app.config, app.chain.clone(), app.state.clone());
    app.wait_for_burn_data().await;

    let orchestrator = app.burn_orchestrator(submitter)?;
    println!("{}", orchestrator.stats());
    let outcome = orchestrator.execute().await?;
    println!("Buy and burn executed in {:?}", outcome.hash);

    readers.shutdown();
    Ok(())
}
