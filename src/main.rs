use chainsaw::{Error, JoinOptions, ShardLimit, SplitOptions};
use clap::{CommandFactory, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
  name = "chainsaw",
  version,
  about = "Split files into shards for easy transport, and join them back.",
  long_about = "Split files into shards for easy transport, and join them back.\n\n\
    With one file, chainsaw splits it (by default into eight shards of nearly equal size). \
    With several files, it treats them as one shard set and joins them back into the original."
)]
struct Cli {
  /// Maximum size of each shard in MB.
  #[arg(short = 's', value_name = "MB", value_parser = clap::value_parser!(u64).range(1..))]
  size: Option<u64>,

  /// Store shards in a new directory while splitting.
  #[arg(short = 'd')]
  directory: bool,

  /// Named prefix for the directory created with -d. Shard file names are not affected;
  /// they are always <file>@<index>.<count>.
  #[arg(short = 'n', value_name = "PREFIX", default_value = "shard", value_parser = parse_prefix)]
  prefix: String,

  /// Display information about each given shard instead of joining.
  #[arg(short = 'i')]
  info: bool,

  /// Enable verbose mode to see what's happening under the hood.
  #[arg(short = 'v')]
  verbose: bool,

  /// One file to split, or every shard of a set to join.
  files: Vec<PathBuf>,
}

fn parse_prefix(value: &str) -> Result<String, String> {
  if value.chars().count() < 3 {
    return Err("shard names really ought to be at least 3 characters long".into());
  }
  Ok(value.to_string())
}

/// Initialize tracing subscriber with environment-based filtering.
fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .compact()
    .init();
}

fn shard_dir_for(source: &Path, prefix: &str) -> Option<PathBuf> {
  let base = source.file_name()?;
  let mut name = std::ffi::OsString::from(format!("{}.", prefix));
  name.push(base);
  Some(source.parent().unwrap_or(Path::new("")).join(name))
}

fn run(cli: Cli) -> chainsaw::Result<()> {
  info!(
    "Supplied parameters: {{ size => {:?} MB, mkdir => {}, prefix => '{}' }}",
    cli.size, cli.directory, cli.prefix
  );

  if cli.info {
    for path in &cli.files {
      let header = chainsaw::inspect(path)?;
      println!("{}: {}", path.display(), header);
    }
    return Ok(());
  }

  match cli.files.as_slice() {
    [] => Ok(()),
    [source] => {
      let mut options = match cli.size {
        Some(mb) => SplitOptions::new(ShardLimit::MaxSize(mb.saturating_mul(BYTES_PER_MB))),
        None => SplitOptions::default(),
      };
      if cli.directory {
        options.shard_dir = shard_dir_for(source, &cli.prefix);
      }

      let report = chainsaw::split(source, &options)?;
      for shard in &report.shards {
        println!("{}", shard.display());
      }
      Ok(())
    }
    shards => {
      let restored = chainsaw::join(shards, &JoinOptions::default())?;
      println!("{}", restored.display());
      Ok(())
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  if cli.files.is_empty() {
    // Nothing to do: show usage and succeed.
    let _ = Cli::command().print_long_help();
    return ExitCode::SUCCESS;
  }

  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      report(&err);
      ExitCode::FAILURE
    }
  }
}

fn report(err: &Error) {
  eprintln!("chainsaw: {}", err.chain());
}
