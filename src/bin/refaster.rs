//! CLI for the refaster-dsl rewrite engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refaster_dsl::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refaster")]
#[command(author, version, about = "Template-based rewrites for Java sources", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RuleArgs {
    /// Additional rule catalog (YAML or JSON)
    #[arg(short, long = "rules")]
    rules: Vec<PathBuf>,

    /// Engine configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run rules whose qualified name matches this regex
    #[arg(short, long)]
    include: Option<String>,

    /// Do not load the bundled rule catalogs
    #[arg(long)]
    no_builtin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite Java sources in place
    Apply {
        #[command(flatten)]
        rules: RuleArgs,

        /// Path to a project or a single file
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Preview changes without applying
        #[arg(long)]
        dry_run: bool,
    },

    /// Report pending rewrites; exits non-zero if there are any
    Check {
        #[command(flatten)]
        rules: RuleArgs,

        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List the loaded rules
    Rules {
        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Load the rule catalogs and report rejected rules
    Validate {
        #[command(flatten)]
        rules: RuleArgs,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Apply {
            rules,
            path,
            dry_run,
        } => cmd_apply(rules, path, dry_run),
        Commands::Check { rules, path } => cmd_check(rules, path),
        Commands::Rules { rules } => cmd_rules(rules),
        Commands::Validate { rules } => cmd_validate(rules),
    }
}

fn build_engine(args: RuleArgs) -> Result<Engine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.rule_files.extend(args.rules);
    if args.include.is_some() {
        config.include_pattern = args.include;
    }
    if args.no_builtin {
        config.builtin_rules = false;
    }

    let engine = Engine::builder()
        .config(config)
        .build()
        .context("Failed to load rules")?;
    for error in engine.load_errors() {
        eprintln!("warning: {error}");
    }
    Ok(engine)
}

fn cmd_apply(args: RuleArgs, path: PathBuf, dry_run: bool) -> Result<ExitCode> {
    let engine = Arc::new(build_engine(args)?);
    let mut refactor = Refactor::in_repo(&path).rules(engine);
    if dry_run {
        refactor = refactor.dry_run();
    }

    let result = refactor.apply().context("Rewrite failed")?;

    if dry_run {
        println!("{}", result.colorized_diff());
        println!("\n{}", result.summary);
    } else {
        println!(
            "Applied {} rewrite(s) in {} file(s)",
            result.replacements().count(),
            result.files_modified()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_check(args: RuleArgs, path: PathBuf) -> Result<ExitCode> {
    let engine = Arc::new(build_engine(args)?);
    let result = Refactor::in_repo(&path)
        .rules(engine)
        .dry_run()
        .apply()
        .context("Check failed")?;

    for (file, replacement) in result.replacements() {
        println!(
            "{}:{}: {} -> {}",
            file.display(),
            replacement.span.start,
            replacement.rule,
            replacement.text
        );
    }

    if result.files_modified() == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        println!("\n{}", result.summary);
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_rules(args: RuleArgs) -> Result<ExitCode> {
    let engine = build_engine(args)?;
    for rule in engine.rules() {
        let (name, before, after) = rule.documentation();
        let mut flags = Vec::new();
        if rule.also_negation {
            flags.push("negation".to_string());
        }
        if !rule.behavior_preserving {
            flags.push("unsafe".to_string());
        }
        if rule.priority != 0 {
            flags.push(format!("priority={}", rule.priority));
        }
        if flags.is_empty() {
            println!("{name}");
        } else {
            println!("{name} [{}]", flags.join(", "));
        }
        println!("    {before}  =>  {after}");
        if let Some(risk) = &rule.risk {
            println!("    risk: {risk}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(args: RuleArgs) -> Result<ExitCode> {
    let engine = build_engine(args)?;
    if engine.load_errors().is_empty() {
        println!("{} rule(s) loaded", engine.rules().len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} rule(s) loaded, {} rejected",
            engine.rules().len(),
            engine.load_errors().len()
        );
        Ok(ExitCode::FAILURE)
    }
}
