use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use architector::cli::Cli;
use architector::config::ArchConfig;
use architector::{diagram, error, fs_index, matrix, tu};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ArchConfig::load(&cli.base_dir);
    let fs = fs_index::scan(&cli.base_dir, &config)?;
    tracing::info!(entries = fs.len(), "scanned source tree");

    let puml_text = std::fs::read_to_string(&cli.puml).map_err(|source| error::ArchError::ScanRootIo {
        path: cli.puml.clone(),
        source,
    })?;
    let (mut root, relationships) = diagram::parse(&puml_text)?;
    let model = diagram::bind(&mut root, &relationships, &fs, &cli.base_dir)?;
    tracing::info!(
        allowed_rules = model.allowed_rules.len(),
        fs_groups = model.fs_groups.len(),
        "bound architecture diagram"
    );

    let deps = tu::deps(&cli.compdb, &fs)?;
    tracing::info!(dep_count = deps.len(), "extracted code dependencies");

    let report = matrix::check(&model, deps);

    std::fs::create_dir_all(&cli.reports_dir)?;
    matrix::write_violations_csv(&cli.reports_dir.join("violations_report.csv"), &fs, &report)?;
    matrix::write_file_index_csv(&cli.reports_dir.join("file_index.csv"), &fs)?;

    #[cfg(feature = "heatmap")]
    if let Some(heatmap_path) = &cli.heatmap {
        matrix::write_heatmap(heatmap_path, fs.len(), &report)?;
    }

    println!("TOTAL VIOLATIONS = {}", report.violation_count());

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
