use clap::Parser;
use nnet::config::{self, ViewConfig};
use nnet::error::{NetError, Result};
use nnet::mnist::load_mnist;
use nnet::render::captioned;
use nnet::sink::InferImageReport;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

/// Show the images behind an `nnet infer` log as text art.
///
/// Reads the log from stdin, e.g. `nnet infer | infview`.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// JSON configuration file (default: default.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Images file the log was produced from
    #[arg(long)]
    infer_images_file: Option<PathBuf>,

    /// Labels file the log was produced from
    #[arg(long)]
    infer_labels_file: Option<PathBuf>,

    /// Show only misclassified images (true or false)
    #[arg(long)]
    only_mistake: Option<bool>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg: ViewConfig = config::resolve(cli.config.as_deref())?;
    if let Some(path) = cli.infer_images_file {
        cfg.infer_images_file = path;
    }
    if let Some(path) = cli.infer_labels_file {
        cfg.infer_labels_file = path;
    }
    if let Some(only_mistake) = cli.only_mistake {
        cfg.only_mistake = only_mistake;
    }

    let images = load_mnist(&cfg.infer_images_file, &cfg.infer_labels_file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().lines() {
        let Some(report) = InferImageReport::parse_line(&line?)? else {
            continue;
        };
        if cfg.only_mistake && !report.is_mistake() {
            continue;
        }
        let image = images.get(report.image_index).ok_or_else(|| {
            NetError::Log(format!(
                "image {} is not in {}",
                report.image_index,
                cfg.infer_images_file.display()
            ))
        })?;
        writeln!(
            out,
            "{}",
            captioned(image, report.infer_index, report.label, report.answer)
        )?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
