use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use proxy_bench::{
    bench::{render_summary, Aggregator, BenchConfig, Probe, SummaryWriter, WorkerPool, WorkerSettings},
    logging,
    proxy::{EndpointParser, IpinfoClient, IsoCountries, ProxyEndpoint, ProxyType},
    tui::{self, LiveView},
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Benchmark a rotating proxy: exit IP churn, network types and latency
#[derive(Parser)]
#[command(name = "proxy-bench")]
#[command(about = "Benchmark a rotating proxy: exit IP churn, network types and latency")]
#[command(version)]
struct Cli {
    /// Proxy endpoint: HOST:PORT, HOST:PORT:USER:PASS, USER:PASS@HOST:PORT or scheme://[USER:PASS@]HOST:PORT
    #[arg(short, long, env = "PROXY")]
    proxy: Option<String>,

    /// Proxy host, when not using --proxy
    #[arg(long, env = "PROXY_HOST")]
    host: Option<String>,

    /// Proxy port, when not using --proxy
    #[arg(long, env = "PROXY_PORT")]
    port: Option<u16>,

    /// Proxy username
    #[arg(short, long, env = "PROXY_USERNAME")]
    username: Option<String>,

    /// Proxy password
    #[arg(short = 'P', long, env = "PROXY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Proxy type (http, https, socks5)
    #[arg(short = 't', long, default_value = "http")]
    proxy_type: String,

    /// Number of concurrent workers (prompted for when omitted)
    #[arg(short = 'n', long)]
    threads: Option<usize>,

    /// Timeout in seconds for each request
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Pause between iterations of a worker in milliseconds
    #[arg(long, default_value = "0")]
    retry_delay_ms: u64,

    /// Stop each worker after this many iterations
    #[arg(long)]
    iterations: Option<u64>,

    /// Directory for the summary and debug log files
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Seconds between summary file rewrites
    #[arg(long, default_value = "3")]
    summary_interval: u64,

    /// Live view refresh interval in milliseconds
    #[arg(long, default_value = "1000")]
    refresh_ms: u64,

    /// Log progress lines instead of showing the live table
    #[arg(long)]
    headless: bool,
}

impl Cli {
    fn endpoint(&self) -> Result<ProxyEndpoint> {
        let ptype = parse_proxy_type(&self.proxy_type)?;

        let mut endpoint = match (&self.proxy, &self.host, self.port) {
            (Some(spec), _, _) => EndpointParser::parse(spec, ptype)
                .ok_or_else(|| anyhow!("Invalid proxy endpoint: {}", spec))?,
            (None, Some(host), Some(port)) => ProxyEndpoint::new(host.as_str(), port, ptype),
            _ => bail!("Specify the proxy with --proxy, or with both --host and --port"),
        };

        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => endpoint = endpoint.with_auth(user.as_str(), pass.as_str()),
            (None, None) => {}
            _ => bail!("--username and --password must be given together"),
        }

        Ok(endpoint)
    }

    fn config(&self, workers: usize) -> BenchConfig {
        let config = BenchConfig::new()
            .with_workers(workers)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_refresh_interval(Duration::from_millis(self.refresh_ms))
            .with_summary_interval(Duration::from_secs(self.summary_interval))
            .with_log_dir(self.log_dir.clone());

        match self.iterations {
            Some(n) => config.with_max_iterations(n),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let endpoint = cli.endpoint()?;

    let workers = match cli.threads {
        Some(n) => n,
        None => prompt_threads()?,
    };
    let config = cli.config(workers);
    config.validate()?;

    let _log_guard = logging::init_logging(cli.headless, &config.log_dir);

    let client = Arc::new(
        IpinfoClient::new(&endpoint, config.timeout).context("Failed to build HTTP client")?,
    );
    let probe = Probe::new(client.clone(), client, Arc::new(IsoCountries));
    let aggregator = Arc::new(Aggregator::new());
    let cancel = CancellationToken::new();

    let writer = SummaryWriter::create(&config.log_dir, endpoint.host.clone())
        .await
        .context("Failed to create summary file")?;
    let summary_path = writer.path().to_path_buf();
    info!(
        proxy = %endpoint,
        workers = config.workers,
        summary = %summary_path.display(),
        "starting benchmark"
    );

    let summary_task = tokio::spawn(writer.run(
        Arc::clone(&aggregator),
        config.summary_interval,
        cancel.clone(),
    ));

    let pool = WorkerPool::spawn(
        config.workers,
        probe,
        Arc::clone(&aggregator),
        WorkerSettings::from(&config),
        cancel.clone(),
    );

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    // Workers only finish on their own under an iteration limit.
    let pool_cancel = cancel.clone();
    let worker_task = tokio::spawn(async move {
        let reports = pool.join().await;
        pool_cancel.cancel();
        reports
    });

    let view_result = if cli.headless {
        tui::log_progress(Arc::clone(&aggregator), config.summary_interval, cancel.clone()).await;
        Ok(())
    } else {
        let mut view = LiveView::new(
            Arc::clone(&aggregator),
            endpoint.host.clone(),
            config.workers,
            config.refresh_interval,
            cancel.clone(),
        );
        tokio::task::spawn_blocking(move || view.run()).await?
    };
    cancel.cancel();

    let reports = worker_task.await?;
    summary_task.await?;

    if let Err(e) = &view_result {
        error!("live view failed: {}", e);
    }

    let iterations: u64 = reports.iter().map(|r| r.iterations).sum();
    info!(workers = reports.len(), iterations, "benchmark stopped");

    print!("{}", render_summary(&endpoint.host, &aggregator.snapshot()));
    println!("\nSummary written to {}", summary_path.display());

    view_result
}

fn prompt_threads() -> Result<usize> {
    println!("Rotating Proxy Benchmark Tool");
    print!("[Threads]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim();
    line.parse()
        .map_err(|e| anyhow!("Invalid thread count {:?}: {}", line, e))
}

fn parse_proxy_type(s: &str) -> Result<ProxyType> {
    ProxyType::from_scheme(s)
        .ok_or_else(|| anyhow!("Invalid proxy type: {}. Use: http, https, socks5", s))
}
