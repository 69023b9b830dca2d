//! `potm`: executive-move pipeline and review CLI.
//!
//! ```text
//! potm run --once                  # one pipeline run
//! potm run --company "Tyson"       # one run restricted to matching companies
//! potm run                         # continuous, every --interval seconds
//! potm import data/companies.csv
//! potm review list --status pending
//! potm review approve <id> --by editor
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use people_on_the_move::ingest::scheduler::run_forever;
use people_on_the_move::metrics::{ensure_metrics_described, install_prometheus};
use people_on_the_move::model::{AnnouncementId, AnnouncementStatus};
use people_on_the_move::registry::load_companies_from;
use people_on_the_move::workflow::AnnouncementEdit;
use people_on_the_move::{
    import_companies, AppConfig, CancelFlag, LocalStore, Pipeline, RunOptions, Store,
    WorkflowEngine,
};

#[derive(Parser, Debug)]
#[command(name = "potm", version, about = "People on the Move: executive-move news pipeline")]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $POTM_CONFIG_PATH, then config/potm.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON snapshot store; overrides `pipeline.store_path`.
    #[arg(long, global = true, env = "POTM_STORE_PATH")]
    store: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, extract, merge and draft.
    Run(RunArgs),
    /// Import companies from a delimited file (name, domain, website, aliases).
    Import { file: PathBuf },
    /// Review announcements and their posts.
    #[command(subcommand)]
    Review(ReviewCmd),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Single run, then exit.
    #[arg(long)]
    once: bool,
    /// Only companies whose name contains this. Implies a single run.
    #[arg(long)]
    company: Option<String>,
    /// Seconds between runs in continuous mode.
    #[arg(long)]
    interval: Option<u64>,
    /// Do not draft posts for new announcements.
    #[arg(long)]
    no_draft: bool,
    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
enum ReviewCmd {
    List {
        #[arg(long)]
        status: Option<AnnouncementStatus>,
    },
    Show { id: AnnouncementId },
    Stats,
    Edit {
        id: AnnouncementId,
        #[arg(long)]
        person: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        previous_title: Option<String>,
        /// Replace the text of the current draft instead of editing fields.
        #[arg(long, conflicts_with_all = ["person", "title", "previous_title"])]
        text: Option<String>,
    },
    Regenerate {
        id: AnnouncementId,
        /// Use this template instead of trying AI first.
        #[arg(long)]
        template: Option<usize>,
    },
    Approve {
        id: AnnouncementId,
        #[arg(long, env = "POTM_REVIEWER")]
        by: String,
    },
    Reject { id: AnnouncementId },
    Posted {
        id: AnnouncementId,
        #[arg(long)]
        url: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("people_on_the_move=info,potm=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut cfg = match &cli.config {
        Some(p) => AppConfig::load_from(p)?,
        None => AppConfig::load_default()?,
    };
    if let Some(p) = &cli.store {
        cfg.pipeline.store_path = p.clone();
    }
    let store: Arc<dyn Store> = Arc::new(
        LocalStore::open(&cfg.pipeline.store_path)
            .with_context(|| format!("opening store {}", cfg.pipeline.store_path.display()))?,
    );

    match cli.command {
        Command::Run(args) => run(cfg, store, args).await,
        Command::Import { file } => {
            let companies = load_companies_from(&file)?;
            let r = import_companies(store.as_ref(), companies)?;
            println!(
                "parsed {} · added {} · already existed {}",
                r.parsed, r.added, r.already_exists
            );
            Ok(())
        }
        Command::Review(cmd) => {
            let pipeline = Pipeline::from_config(&cfg, store);
            review(pipeline.workflow(), cmd, cfg.extractor.min_confidence).await
        }
    }
}

async fn run(mut cfg: AppConfig, store: Arc<dyn Store>, args: RunArgs) -> Result<()> {
    if let Some(addr) = args.metrics_addr {
        install_prometheus(addr)?;
    } else {
        ensure_metrics_described();
    }
    if let Some(secs) = args.interval {
        if secs == 0 {
            bail!("--interval must be positive");
        }
        cfg.pipeline.interval_secs = secs;
    }
    if store.list_companies()?.is_empty() {
        if let Some(path) = cfg.pipeline.companies_path.clone() {
            let r = import_companies(store.as_ref(), load_companies_from(&path)?)?;
            tracing::info!(added = r.added, path = %path.display(), "seeded companies");
        }
    }

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; finishing current step");
                cancel.cancel();
            }
        });
    }

    let opts = RunOptions {
        company: args.company.clone(),
        auto_draft: args.no_draft.then_some(false),
    };
    let pipeline = Arc::new(Pipeline::from_config(&cfg, store));

    if args.once || args.company.is_some() {
        let report = pipeline.run_once(&opts, &cancel).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let interval = Duration::from_secs(cfg.pipeline.interval_secs);
    tracing::info!(interval_secs = cfg.pipeline.interval_secs, "continuous mode");
    run_forever(pipeline, interval, opts, cancel).await;
    Ok(())
}

/// Announcements scored below `min_confidence` are flagged with `?` for a closer look.
async fn review(wf: &WorkflowEngine, cmd: ReviewCmd, min_confidence: f32) -> Result<()> {
    match cmd {
        ReviewCmd::List { status } => {
            for a in wf.list_by_status(status)? {
                let flag = if a.confidence < min_confidence { "?" } else { " " };
                println!(
                    "{}  {:<8}  {:.2}{}  {} · {} · {}",
                    a.id,
                    a.status,
                    a.confidence,
                    flag,
                    a.company_id,
                    a.person_name,
                    a.new_title.as_deref().unwrap_or("-")
                );
            }
        }
        ReviewCmd::Show { id } => {
            let a = wf.get(id)?;
            println!("{}", serde_json::to_string_pretty(&a)?);
            if a.confidence < min_confidence {
                println!("\nlow confidence ({:.2} < {:.2}): check the sources", a.confidence, min_confidence);
            }
            match wf.current_post(id)? {
                Some(p) => println!(
                    "\n--- post r{} ({}, {:?}) ---\n{}",
                    p.revision,
                    p.generator_kind.as_str(),
                    p.status,
                    p.text
                ),
                None => println!("\n(no post yet)"),
            }
        }
        ReviewCmd::Stats => {
            println!("{}", serde_json::to_string_pretty(&wf.stats()?)?);
        }
        ReviewCmd::Edit {
            id,
            person,
            title,
            previous_title,
            text,
        } => {
            if let Some(text) = text {
                let p = wf.edit_post_text(id, &text)?;
                println!("post r{} updated", p.revision);
            } else {
                let a = wf.edit(
                    id,
                    AnnouncementEdit {
                        person_name: person,
                        new_title: title,
                        previous_title,
                    },
                )?;
                println!("{} is now {}", a.id, a.status);
            }
        }
        ReviewCmd::Regenerate { id, template } => {
            let (_, p) = wf.regenerate(id, template).await?;
            println!("r{} ({})\n{}", p.revision, p.generator_kind.as_str(), p.text);
        }
        ReviewCmd::Approve { id, by } => {
            let a = wf.approve(id, &by).await?;
            println!("{} approved", a.id);
        }
        ReviewCmd::Reject { id } => {
            let a = wf.reject(id)?;
            println!("{} rejected", a.id);
        }
        ReviewCmd::Posted { id, url } => {
            let a = wf.mark_posted(id, &url)?;
            println!("{} posted", a.id);
        }
    }
    Ok(())
}
