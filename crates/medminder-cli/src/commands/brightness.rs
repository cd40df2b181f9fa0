use clap::Args;
use medminder_core::{BrightnessSmoother, ConfigStore};

use crate::context::CliResult;

#[derive(Args)]
pub struct BrightnessArgs {
    /// Lux readings, oldest first
    #[arg(required = true)]
    pub lux: Vec<f64>,
    /// Smoothing factor; defaults to display.brightness_alpha
    #[arg(long)]
    pub alpha: Option<f64>,
}

pub fn run(args: BrightnessArgs) -> CliResult {
    let alpha = match args.alpha {
        Some(alpha) => alpha,
        None => ConfigStore::open()?.config().display.brightness_alpha,
    };
    let mut smoother = BrightnessSmoother::new(alpha);
    for lux in args.lux {
        println!("{lux:>10.1} lux -> {:.3}", smoother.update(lux));
    }
    Ok(())
}
