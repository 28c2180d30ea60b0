use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use nnet::config::{self, TrainingConfig};
use nnet::cost::CostFunction;
use nnet::mnist::{self, load_mnist};
use nnet::optimizers::Regularization;
use nnet::sink::TsvSink;
use nnet::utils::WeightInitialization;
use nnet::{NetworkBuilder, Result, Topology};
use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Train and run a fully-connected network on MNIST digits",
    after_help = "Results are written to stdout as tab-separated lines: \
                  doneTrainEpoch, doneTrain, doneInferImage and doneInfer."
)]
struct Cli {
    /// JSON configuration file (default: default.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train, evaluating after every epoch, then write the parameters
    Train(TrainArgs),
    /// Classify images with previously trained parameters
    Infer(InferArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Topology file
    #[arg(long)]
    network_file: Option<PathBuf>,

    /// Parameter file
    #[arg(long)]
    parameters_file: Option<PathBuf>,

    /// quadratic or crossEntropy
    #[arg(long)]
    cost_function: Option<CostFunction>,

    /// null, l1 or l2
    #[arg(long)]
    regularization: Option<Regularization>,

    #[arg(long)]
    weight_decay_rate: Option<f64>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// broad or narrow
    #[arg(long)]
    weight_initialization: Option<WeightInitialization>,

    #[arg(long)]
    epochs_number: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    train_images_offset: Option<usize>,

    #[arg(long)]
    train_images_number: Option<usize>,

    #[arg(long)]
    eval_images_offset: Option<usize>,

    #[arg(long)]
    eval_images_number: Option<usize>,

    /// Start from fresh random parameters even if the parameter file exists
    #[arg(long)]
    no_read_parameters: bool,
}

#[derive(Args, Debug)]
struct InferArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long)]
    infer_images_file: Option<PathBuf>,

    #[arg(long)]
    infer_labels_file: Option<PathBuf>,

    #[arg(long)]
    infer_images_offset: Option<usize>,

    #[arg(long)]
    infer_images_number: Option<usize>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl CommonArgs {
    fn apply(&self, cfg: &mut TrainingConfig) {
        set(&mut cfg.network_file, self.network_file.clone());
        set(&mut cfg.parameters_file, self.parameters_file.clone());
        set(&mut cfg.cost_function, self.cost_function);
        set(&mut cfg.regularization, self.regularization);
        set(&mut cfg.weight_decay_rate, self.weight_decay_rate);
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
    }
}

impl TrainArgs {
    fn apply(&self, cfg: &mut TrainingConfig) {
        self.common.apply(cfg);
        set(&mut cfg.weight_initialization, self.weight_initialization);
        set(&mut cfg.epochs_number, self.epochs_number);
        set(&mut cfg.batch_size, self.batch_size);
        set(&mut cfg.learning_rate, self.learning_rate);
        set(&mut cfg.train_images_offset, self.train_images_offset);
        set(&mut cfg.train_images_number, self.train_images_number);
        set(&mut cfg.eval_images_offset, self.eval_images_offset);
        set(&mut cfg.eval_images_number, self.eval_images_number);
        if self.no_read_parameters {
            cfg.read_parameters = false;
        }
    }
}

impl InferArgs {
    fn apply(&self, cfg: &mut TrainingConfig) {
        self.common.apply(cfg);
        set(&mut cfg.infer_images_file, self.infer_images_file.clone());
        set(&mut cfg.infer_labels_file, self.infer_labels_file.clone());
        set(&mut cfg.infer_images_offset, self.infer_images_offset);
        set(&mut cfg.infer_images_number, self.infer_images_number);
    }
}

fn builder(cfg: &TrainingConfig) -> NetworkBuilder {
    NetworkBuilder::new(cfg.hyper_parameters())
        .weight_initialization(cfg.weight_initialization)
        .seed(cfg.seed)
}

fn train(cfg: &TrainingConfig) -> Result<()> {
    let load_start = Instant::now();
    let train_set = load_mnist(&cfg.train_images_file, &cfg.train_labels_file)?;
    let train_images = mnist::slice(&train_set, cfg.train_images_offset, cfg.train_images_number)?;
    let eval_set = load_mnist(&cfg.eval_images_file, &cfg.eval_labels_file)?;
    let eval_images = mnist::slice(&eval_set, cfg.eval_images_offset, cfg.eval_images_number)?;
    info!("data loading time: {:.2} seconds", load_start.elapsed().as_secs_f64());

    let topology = if cfg.network_file.as_os_str().is_empty() || !cfg.network_file.exists() {
        warn!(
            "network file '{}' not found, using the default topology",
            cfg.network_file.display()
        );
        Topology::default()
    } else {
        Topology::load(&cfg.network_file)?
    };
    let mut net = builder(cfg).build(&topology)?;
    if cfg.read_parameters && cfg.parameters_file.exists() {
        net.load_parameters(&cfg.parameters_file)?;
    }

    let train_start = Instant::now();
    let mut sink = TsvSink::new(io::stdout().lock());
    net.train(
        cfg.epochs_number,
        cfg.batch_size,
        train_images,
        eval_images,
        &mut sink,
    )?;
    info!("total training time: {:.2} seconds", train_start.elapsed().as_secs_f64());

    net.save_parameters(&cfg.parameters_file)
}

fn infer(cfg: &TrainingConfig) -> Result<()> {
    let infer_set = load_mnist(&cfg.infer_images_file, &cfg.infer_labels_file)?;
    let images = mnist::slice(&infer_set, cfg.infer_images_offset, cfg.infer_images_number)?;

    let mut net = builder(cfg).build(&Topology::load(&cfg.network_file)?)?;
    net.load_parameters(&cfg.parameters_file)?;

    let mut sink = TsvSink::new(io::stdout().lock());
    net.infer(images, &mut sink)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg: TrainingConfig = config::resolve(cli.config.as_deref())?;
    match cli.command {
        Command::Train(args) => {
            args.apply(&mut cfg);
            cfg.validate()?;
            train(&cfg)
        }
        Command::Infer(args) => {
            args.apply(&mut cfg);
            cfg.validate()?;
            infer(&cfg)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
