use anyhow::{Result, anyhow};
use bandep_bundler::{Bundler, Config, collect_entries, print_build_report};
use bandep_plugin::{BannedDependenciesPlugin, load_ban_list};
use clap::Parser;
use colored::Colorize;
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let mut cfg = Config::parse();
    cfg.initialize()?;
    debug!("Config: {:?}", cfg);

    let start = Instant::now();
    let root = cfg.root()?.clone();

    let rules = load_ban_list(cfg.ban_list()?)?;
    info!("Loaded {} ban rules from {}", rules.len(), cfg.ban_list()?.display());

    let entries: Vec<PathBuf> = if cfg.entries.is_empty() {
        collect_entries(&root, cfg.entry_glob.as_deref())?
    } else {
        cfg.entries
            .iter()
            .map(|entry| if entry.is_absolute() { entry.clone() } else { root.join(entry) })
            .collect()
    };
    if entries.is_empty() {
        return Err(anyhow!("No entry files found under {}", root.display()));
    }
    info!("Found {} entry files", entries.len());

    let mut bundler = Bundler::new(root);
    bundler.add_plugin(BannedDependenciesPlugin::new(rules)?);

    let num_threads = rayon::current_num_threads();
    info!("Checking {} entries (using {} threads)", entries.len(), num_threads);
    let result = bundler.build(&entries);

    let elapsed_ms = start.elapsed().as_millis();
    print_build_report(&mut stdout, &result)?;
    writeln!(
        stdout,
        "\n{} Finished in {}ms on {} modules (using {} threads).",
        "●".bright_blue(),
        elapsed_ms.to_string().cyan(),
        result.modules_visited.to_string().cyan(),
        num_threads.to_string().cyan()
    )?;
    stdout.flush()?;

    if !result.success() {
        // Non-zero exit to fail CI
        std::process::exit(1);
    }

    Ok(())
}
