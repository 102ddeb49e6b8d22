//! Application layer.
//! Loads/merges config, initializes logging, installs signal handlers, and
//! dispatches the subcommands onto the migration engine. Interactive
//! confirmation lives here, passed into the orchestrator as a plain
//! `confirm(plan) -> bool` capability.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use crate::cli::{Args, Command};
use crate::config::{
    default_config_path, ensure_default_config_exists, load_config_from_xml, Config, CONFIG_ENV,
};
use crate::container::{Mode, Store};
use crate::engine::{external_link_files, replicate, Migration, MigrationPlan, MigrationReport};
use crate::errors::MigrateError;
use crate::logging::init_tracing;
use crate::output as out;
use crate::shutdown;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
            out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
            out::print_info(&format!(
                "To override, unset {CONFIG_ENV} or set it to another file."
            ));
            return Ok(());
        }
        match default_config_path() {
            Ok(p) => {
                out::print_info(&format!("Default h5shift config path:\n  {}\n", p.display()));
                if p.exists() {
                    out::print_info("A config file already exists at that location.");
                } else {
                    out::print_info("No config file exists there yet. Run without --print-config to create a template.");
                }
            }
            Err(e) => {
                out::print_error(&format!("Could not determine a default config path: {e}"));
            }
        }
        return Ok(());
    }

    // Create template config if none exists (before logging init)
    if let Some(path) = ensure_default_config_exists() {
        out::print_success(&format!(
            "A template h5shift config was written to: {}",
            path.display()
        ));
        out::print_info("Edit the file to set `log_level`, `log_file` and `assume_yes`, then re-run this command.");
    }

    // Build config (may read XML). CLI args override config values.
    let mut cfg = load_config_from_xml().unwrap_or_default();
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt: Option<tracing_appender::non_blocking::WorkerGuard> =
        init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; shutting down gracefully...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .expect("failed to install signal handler");
    }

    if shutdown::is_requested() {
        return Ok(());
    }

    debug!("Starting h5shift: {:?}", args);

    let result = match args.command {
        Some(Command::Rename {
            ref directory,
            ref prefix,
            ref new_prefix,
            mode,
            downcast,
            ..
        }) => run_rename(&cfg, directory, prefix, new_prefix, mode.into(), downcast),
        Some(Command::Recast {
            ref input,
            ref output,
            ..
        }) => run_recast(&cfg, input, output),
        Some(Command::Links { ref file }) => run_links(file),
        None => {
            out::print_error("No subcommand given; see --help.");
            bail!("no subcommand")
        }
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn run_rename(
    cfg: &Config,
    directory: &std::path::Path,
    prefix: &str,
    new_prefix: &str,
    mode: crate::engine::MigrationMode,
    downcast: bool,
) -> Result<()> {
    let plan = match MigrationPlan::build(directory, prefix, new_prefix, mode) {
        Ok(p) => p,
        Err(e) => {
            error!(code = e.code(), error = %e, "could not build a migration plan");
            return Err(e.into());
        }
    };

    print_plan(&plan);
    if cfg.dry_run {
        out::print_info("Dry-run: no files were modified.");
        return Ok(());
    }

    let assume_yes = cfg.assume_yes;
    let outcome = Migration::run(plan, downcast, |_plan| {
        assume_yes || prompt_confirm("Do you want to rename these files? (Y/n): ")
    })?;

    match outcome {
        None => {
            out::print_info("Rename cancelled.");
            Ok(())
        }
        Some(report) => finish_report(report),
    }
}

fn run_recast(cfg: &Config, input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    out::print_user(&format!(
        "{} ->\t{}",
        input.display(),
        output.display()
    ));
    if !cfg.assume_yes && !prompt_confirm("Do you want to recast this file? (Y/n): ") {
        out::print_info("Recast cancelled.");
        return Ok(());
    }

    let src = Store::open(input, Mode::Read)
        .with_context(|| format!("open source container '{}'", input.display()))?;
    let mut dst = Store::open(output, Mode::Create)
        .with_context(|| format!("create destination container '{}'", output.display()))?;
    let summary = replicate(&src, &mut dst, true)?;
    dst.close()
        .with_context(|| format!("close destination container '{}'", output.display()))?;

    info!(
        groups = summary.groups,
        datasets = summary.datasets,
        "recast complete"
    );
    out::print_success(&format!(
        "Recast {} dataset(s) into {}",
        summary.datasets,
        output.display()
    ));
    Ok(())
}

fn run_links(file: &std::path::Path) -> Result<()> {
    let store = Store::open(file, Mode::Read)
        .with_context(|| format!("open container '{}'", file.display()))?;
    for name in external_link_files(&store)? {
        out::print_user(&name);
    }
    Ok(())
}

fn print_plan(plan: &MigrationPlan) {
    out::print_info(&format!(
        "Found {} matching file(s) in {} ({} mode):",
        plan.records().len(),
        plan.directory().display(),
        plan.mode()
    ));
    for rec in plan.records() {
        out::print_user(&format!("{:<24}->\t{}", rec.old_name, rec.new_name));
    }
}

/// Blocking yes/no prompt on stdin; anything but a leading 'n' proceeds.
fn prompt_confirm(question: &str) -> bool {
    print!("{question}");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    !line.trim().eq_ignore_ascii_case("n")
}

fn finish_report(report: MigrationReport) -> Result<()> {
    out::print_info(&format!(
        "Transferred {} file(s), rewrote {} link(s).",
        report.transferred, report.links_rewritten
    ));
    if report.is_success() {
        out::print_success("Files renamed, links updated.");
        return Ok(());
    }
    for failure in &report.failures {
        if let Some(me) = failure.error.downcast_ref::<MigrateError>() {
            error!(code = me.code(), file = %failure.file, error = %me, "migration failure");
        }
        out::print_error(&format!("{}: {:#}", failure.file, failure.error));
    }
    bail!("{} file(s) failed to migrate", report.failures.len())
}
