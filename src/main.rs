//! The `spritefetch` binary: prints a random sprite that fits the terminal,
//! or with `--test` every sprite in the catalog with both palettes.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use colored::*;

use spritefetch::catalog::{self, Catalog};
use spritefetch::{observability, render_catalog, render_random, terminal};
use spritefetch::{SpriteConfig, SpriteError};

#[derive(Parser, Debug)]
#[command(name = "spritefetch", author, version, about = "Show a random sprite.", long_about = None)]
struct Cli {
    /// Output all sprites.
    #[arg(short, long, default_value_t = false)]
    test: bool,
}

fn run(cli: &Cli) -> Result<(), SpriteError> {
    let config = SpriteConfig::from_env()?;
    observability::init_logging(config.log_level.as_deref());

    let external: Vec<u8>;
    let catalog = match &config.catalog_path {
        Some(path) => {
            log::info!("Using catalog file {}", path.display());
            external = std::fs::read(path)?;
            Catalog::parse(&external)?
        }
        None => catalog::embedded()?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.test {
        render_catalog(&catalog, &mut out)?;
    } else {
        let bounds = terminal::query_bounds();
        let mut rng = rand::rng();
        render_random(&catalog, bounds, &config, &mut rng, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
