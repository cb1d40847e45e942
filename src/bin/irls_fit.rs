// Simulate a logistic data set and fit it by IRLS
use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use logit_irls::{fit_logistic_irls, simulate::simulate_logistic, ConvergenceNorm, IrlsOptions};

#[derive(Parser, Debug)]
#[command(name = "irls-fit", version, about = "Fit a simulated logistic regression by IRLS")]
struct Args {
    /// Seed for the data simulation
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of observations
    #[arg(short, long, default_value_t = 300)]
    n: usize,

    /// True intercept of the data-generating model
    #[arg(long, default_value_t = -8.0, allow_hyphen_values = true)]
    intercept: f64,

    /// True slope of the data-generating model
    #[arg(long, default_value_t = 16.0, allow_hyphen_values = true)]
    slope: f64,

    /// Starting coefficients, e.g. --init=-5,10 (zeros when omitted)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    init: Option<Vec<f64>>,

    /// Convergence tolerance on the change in coefficients
    #[arg(long, default_value_t = 1e-8)]
    tolerance: f64,

    /// Iteration budget
    #[arg(long, default_value_t = 100)]
    max_iter: usize,

    /// Measure the change with the Euclidean norm instead of max-abs
    #[arg(long)]
    euclidean: bool,

    /// Evaluate per-observation quantities in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.n == 0 {
        bail!("--n must be positive");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let data = simulate_logistic(&mut rng, args.n, &[args.intercept, args.slope]);

    let mut options = IrlsOptions::default()
        .tolerance(args.tolerance)
        .max_iterations(args.max_iter)
        .parallel(args.parallel);
    if args.euclidean {
        options = options.norm(ConvergenceNorm::Euclidean);
    }
    if let Some(init) = args.init {
        options = options.initial_coefficients(init);
    }

    let fit = fit_logistic_irls(&data.design, &data.y, &options).context("IRLS fit failed")?;
    let summary = fit
        .summarize(&data.design, &data.y)
        .context("could not summarize fit")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Simulated n={} from logit P(y=1) = {} + {} x (seed {})\n",
            args.n, args.intercept, args.slope, args.seed
        );
        println!("{}", summary);
    }

    Ok(())
}
