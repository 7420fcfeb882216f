use clap::{Parser, Subcommand};
use mercury::config::{DEFAULT_CONFIG_FILE, MercuryConfig, Overrides};
use mercury::diagnostics::{self, Reporter};
use mercury::tags::{condensed, is_canonical_tag};
use mercury::{Result, TagRegistry, document, matcher, syntax, validate};

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "mercury")]
#[command(about = "Validate and query neural-network model manifests", long_about = None)]
struct Cli {
    /// Config file naming the tag index and the base model filter.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    tag_index: Option<PathBuf>,

    #[arg(long, global = true)]
    base_model_filter: Option<PathBuf>,

    /// Log loader activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a manifest: grammar, no unfilled values, base model filter, tags.
    ValidateManifest { path: PathBuf },

    /// Check a filter: grammar and tag references.
    ValidateFilter {
        path: PathBuf,

        /// Validate as the definition of this tag.
        #[arg(long)]
        tag_name: Option<String>,
    },

    /// Match a manifest against a filter.
    Match {
        #[arg(long)]
        filter: PathBuf,

        #[arg(long)]
        manifest: PathBuf,
    },

    /// Print the tags a condensed-tag expression expands to.
    ExpandTags { text: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    diagnostics::init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` means the input was understood but rejected.
fn run(cli: Cli) -> Result<bool> {
    let overrides = Overrides {
        tag_index: cli.tag_index.clone(),
        base_model_filter: cli.base_model_filter.clone(),
    };
    let config = || {
        let explicit = cli.config.is_some();
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        MercuryConfig::resolve(&path, explicit, overrides.clone())
    };

    match &cli.cmd {
        Commands::ExpandTags { text } => match condensed::parse(text) {
            Ok(tags) => {
                for tag in tags {
                    println!("{}", tag);
                }
                Ok(true)
            }
            Err(err) => {
                eprintln!("{}: {}", syntax::SyntaxErrorKind::CondensedTagsInvalidSyntax, err);
                Ok(false)
            }
        },

        Commands::ValidateFilter { path, tag_name } => {
            let config = config()?;
            let registry = config.load_registry()?;
            let reporter = Reporter::builtin()?;

            if let Some(name) = tag_name.as_deref().filter(|n| !is_canonical_tag(n)) {
                diagnostics::warn(format!("tag name {:?} is not a canonical identifier", name));
            }
            let root = document::parse_file(path)?;
            match validate::validate_filter(&root, tag_name.as_deref(), &registry) {
                Ok(_) => {
                    println!("{}: valid filter", path.display());
                    Ok(true)
                }
                Err(err) => {
                    eprintln!("{}: {}", path.display(), reporter.filter_invalidity(&err));
                    Ok(false)
                }
            }
        }

        Commands::ValidateManifest { path } => {
            let config = config()?;
            let registry = config.load_registry()?;
            let base = config.load_base_model_filter(&registry)?;
            let reporter = Reporter::builtin()?;

            let root = document::parse_file(path)?;
            match validate::validate_manifest(&root, &base, &registry) {
                Ok(manifest) => {
                    info!(tags = manifest.declared_tags().len(), "manifest accepted");
                    println!("{}: valid manifest", path.display());
                    Ok(true)
                }
                Err(err) => {
                    eprintln!("{}: {}", path.display(), reporter.manifest_invalidity(&err));
                    Ok(false)
                }
            }
        }

        Commands::Match { filter, manifest } => {
            let config = config()?;
            let registry = config.load_registry()?;
            let reporter = Reporter::builtin()?;
            run_match(&registry, &reporter, filter, manifest)
        }
    }
}

fn run_match(
    registry: &TagRegistry,
    reporter: &Reporter,
    filter_path: &Path,
    manifest_path: &Path,
) -> Result<bool> {
    let filter_root = document::parse_file(filter_path)?;
    let filter = match validate::validate_filter(&filter_root, None, registry) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("{}: {}", filter_path.display(), reporter.filter_invalidity(&err));
            return Ok(false);
        }
    };

    let manifest_root = document::parse_file(manifest_path)?;
    let manifest = match syntax::check_manifest(&manifest_root) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("{}: {}", manifest_path.display(), reporter.syntax_error(&err));
            return Ok(false);
        }
    };

    match matcher::match_manifest(&filter, &manifest, registry) {
        Ok(()) => {
            println!("{} matches {}", manifest_path.display(), filter_path.display());
            Ok(true)
        }
        Err(failure) => {
            eprintln!("{}", reporter.match_failure(&failure));
            Ok(false)
        }
    }
}
