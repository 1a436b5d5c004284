use anyhow::Result;
use clap::Parser;

pub mod cli;
pub mod prompt;
pub mod run;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Config : fichier TOML puis overrides CLI
    let resolved = cli.resolve_config()?;
    let mut config = resolved.config;
    if !resolved.dither_chosen {
        config.mosaic.dither_mode = prompt::ask_dither_mode()?;
    }
    log::info!(
        "Bloc {}, seuil {}, {}",
        config.mosaic.block_size,
        config.mosaic.threshold,
        config.mosaic.dither_mode.label()
    );

    // 4. Traitement
    let summary = run::run(
        &cli.input,
        &cli.black_tile,
        &cli.white_tile,
        &cli.output,
        &config,
    )?;

    // 5. Résumé
    for line in summary.report() {
        println!("{line}");
    }
    Ok(())
}
