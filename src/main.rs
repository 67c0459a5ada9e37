//! # Jubbo CLI
//!
//! Usage:
//!   jubbo init
//!   jubbo set sermonTitle "은혜의 강가로"
//!   jubbo ad add --title "수련회 안내" --body "8월 1일 출발"
//!   jubbo render --pdf --png
//!   jubbo check

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jubbo::config::Config;
use jubbo::model::store::FormStore;
use jubbo::model::FormState;
use jubbo::schedule::{WatchLoop, FRAME};
use jubbo::{pdf_file_name, png_file_name, PngTarget, Renderer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a folded two-sheet church bulletin")]
struct Cli {
    /// Config file (default ~/.config/jubbo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Form state file (overrides state_path from the config)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a fresh form
    Init {
        /// Overwrite an existing form
        #[arg(long)]
        force: bool,
    },
    /// Print the form as JSON
    Show,
    /// Set a field by name, e.g. sermonTitle, datePicker, showQr, adsMany
    Set { field: String, value: String },
    /// Edit advertisements
    #[command(subcommand)]
    Ad(AdCommand),
    /// Edit sharing questions
    #[command(subcommand)]
    Share(ShareCommand),
    /// Export the bulletin
    Render(RenderArgs),
    /// Lay out the bulletin and report where the ads went
    Check,
    /// Re-render whenever the form file changes
    Watch(RenderArgs),
    /// Delete the saved form
    Clear,
}

#[derive(Subcommand, Debug)]
enum AdCommand {
    /// List ads with their labels
    List,
    /// Add a variable ad after the other variable ads
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    /// Remove ad N (1-based)
    Rm {
        n: usize,
        /// Confirm removing a default ad
        #[arg(long)]
        yes: bool,
    },
    /// Move variable ad FROM to position TO
    Mv { from: usize, to: usize },
    /// Replace the title and/or body of ad N
    Set {
        n: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Unlock a default ad for this edit
        #[arg(long)]
        unlock: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ShareCommand {
    Add {
        #[arg(default_value = "")]
        q: String,
    },
    Rm { n: usize },
    Set { n: usize, q: String },
}

#[derive(clap::Args, Debug, Clone)]
struct RenderArgs {
    /// Write the PDF (optionally to PATH)
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    pdf: Option<Option<PathBuf>>,
    /// Write a PNG (optionally to PATH)
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    png: Option<Option<PathBuf>>,
    /// PNG of the mobile read view instead of the outer sheet
    #[arg(long)]
    read: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), default_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    let state_path = cli
        .state
        .clone()
        .unwrap_or_else(|| config.resolved_state_path());
    let store = FormStore::new(state_path);

    match cli.command {
        Command::Init { force } => {
            if store.path().exists() && !force {
                bail!(
                    "{} already exists; pass --force to start over",
                    store.path().display()
                );
            }
            store.save(&FormState::default())?;
            info!("initialized {}", store.path().display());
        }
        Command::Show => {
            let form = store.load_or_default();
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Command::Set { field, value } => {
            edit(&store, |form| Ok(form.set_field(&field, &value)?))?;
        }
        Command::Ad(cmd) => ad(&store, cmd)?,
        Command::Share(cmd) => share(&store, cmd)?,
        Command::Render(args) => {
            let renderer = Renderer::new(config).context("loading fonts")?;
            render(&renderer, &store.load_or_default(), &args)?;
        }
        Command::Check => {
            let renderer = Renderer::new(config).context("loading fonts")?;
            check(&renderer, &store.load_or_default())?;
        }
        Command::Watch(args) => {
            let renderer = Renderer::new(config).context("loading fonts")?;
            info!("watching {}", store.path().display());
            WatchLoop::new(store.path(), FRAME)
                .run(|| render(&renderer, &store.load_or_default(), &args));
        }
        Command::Clear => {
            store.clear()?;
            info!("cleared {}", store.path().display());
        }
    }

    Ok(())
}

/// Load, apply one edit, save.
fn edit(store: &FormStore, f: impl FnOnce(&mut FormState) -> Result<()>) -> Result<()> {
    let mut form = store.load_or_default();
    f(&mut form)?;
    store.save(&form)?;
    Ok(())
}

/// 1-based position from the command line to a list index.
fn index(n: usize) -> Result<usize> {
    match n.checked_sub(1) {
        Some(i) => Ok(i),
        None => bail!("positions start at 1"),
    }
}

fn ad(store: &FormStore, cmd: AdCommand) -> Result<()> {
    if let AdCommand::List = cmd {
        let form = store.load_or_default();
        for (i, (ad, label)) in form.ads.iter().zip(form.ad_labels()).enumerate() {
            let lock = if ad.is_default { " [기본]" } else { "" };
            println!("{:>2}. {}{}: {}", i + 1, label, lock, ad.title.trim());
        }
        return Ok(());
    }

    edit(store, |form| {
        match cmd {
            AdCommand::List => {}
            AdCommand::Add { title, body } => {
                let at = form.add_ad();
                form.set_ad(at, &title, &body)?;
            }
            AdCommand::Rm { n, yes } => {
                let removed = form.remove_ad(index(n)?, yes)?;
                info!("removed ad '{}'", removed.title.trim());
            }
            AdCommand::Mv { from, to } => form.move_ad(index(from)?, index(to)?)?,
            AdCommand::Set {
                n,
                title,
                body,
                unlock,
            } => {
                let i = index(n)?;
                if unlock {
                    form.set_ad_editable(i, true)?;
                }
                let current = form.ads.get(i).cloned().unwrap_or_default();
                form.set_ad(
                    i,
                    title.as_deref().unwrap_or(&current.title),
                    body.as_deref().unwrap_or(&current.body),
                )?;
            }
        }
        Ok(())
    })
}

fn share(store: &FormStore, cmd: ShareCommand) -> Result<()> {
    edit(store, |form| {
        match cmd {
            ShareCommand::Add { q } => {
                let at = form.add_share();
                form.set_share(at, &q)?;
            }
            ShareCommand::Rm { n } => {
                form.remove_share(index(n)?)?;
            }
            ShareCommand::Set { n, q } => form.set_share(index(n)?, &q)?,
        }
        Ok(())
    })
}

fn output_path(explicit: &Option<PathBuf>, dir: &Path, name: String) -> PathBuf {
    explicit.clone().unwrap_or_else(|| dir.join(name))
}

fn render(renderer: &Renderer, form: &FormState, args: &RenderArgs) -> Result<()> {
    let config = renderer.config();
    // Without flags, export the PDF.
    let pdf = match (&args.pdf, &args.png) {
        (None, None) => Some(None),
        (pdf, _) => pdf.clone(),
    };

    if let Some(explicit) = pdf {
        let name = pdf_file_name(form, &config.title);
        let path = output_path(&explicit, &config.output_dir, name);
        let bytes = renderer.render_pdf(form)?;
        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} ({} bytes)", path.display(), bytes.len());
    }

    if let Some(explicit) = &args.png {
        let target = if args.read {
            PngTarget::ReadView
        } else {
            PngTarget::Sheet
        };
        let name = png_file_name(form, &config.title, target);
        let path = output_path(explicit, &config.output_dir, name);
        let bytes = renderer.render_png(form, target)?;
        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} ({} bytes)", path.display(), bytes.len());
    }

    Ok(())
}

fn check(renderer: &Renderer, form: &FormState) -> Result<()> {
    let layout = renderer.layout(form)?;
    let (primary, overflow) = if form.ads_many {
        ("inner right panel", "outer left panel")
    } else {
        ("outer left panel", "inner right panel")
    };
    let list = |numbers: &[usize]| {
        if numbers.is_empty() {
            "-".to_string()
        } else {
            numbers
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    };
    println!("mode:     {}", if form.ads_many { "many ads" } else { "normal" });
    println!("primary:  {} ({})", list(&layout.placement.primary), primary);
    println!("overflow: {} ({})", list(&layout.placement.overflow), overflow);
    if layout.warning {
        println!("warning:  ads do not fit; shorten them or turn on adsMany");
    } else {
        println!("warning:  none");
    }
    Ok(())
}
