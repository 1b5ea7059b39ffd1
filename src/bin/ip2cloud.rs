//! ip2cloud: look up IPv4 addresses against cloud provider ranges.

use clap::{ArgAction, Args, Parser, Subcommand};
use ip2cloud::report::{write_plain, OUTPUT_BUFFER_SIZE};
use ip2cloud::{GroupedReport, LookupPipeline, OwnerFilter, PipelineConfig, Store, Trie};
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "ip2cloud")]
#[command(version)]
#[command(about = "Check IPs against cloud provider ranges", long_about = None)]
#[command(after_help = "Examples:
  cat ips.txt | ip2cloud              Lookup IPs from stdin
  ip2cloud 8.8.8.8 3.5.1.1            Lookup specific IPs
  ip2cloud -p aws < ips.txt           Only show AWS matches
  ip2cloud -j < ips.txt               Output as JSON
  ip2cloud add mycloud 10.0.0.0/8     Add a CIDR range
  ip2cloud remove mycloud             Remove a provider
  ip2cloud list                       List all providers
  ip2cloud build --seed ./data        Rebuild trie from a seed directory")]
struct Cli {
    /// Base directory for provider data and the compiled trie
    #[arg(long, global = true, env = "IP2CLOUD_HOME")]
    home: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    lookup: LookupArgs,
}

#[derive(Args)]
struct LookupArgs {
    /// Only match specific providers (comma-separated, e.g. aws,azure)
    #[arg(short, long = "provider", value_name = "LIST")]
    provider: Option<String>,

    /// Print output in JSON format
    #[arg(short, long)]
    json: bool,

    /// Number of concurrent workers (default: available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seed missing provider files from this directory when the trie must be rebuilt
    #[arg(long, value_name = "DIR")]
    seed: Option<PathBuf>,

    /// Addresses to look up; read from stdin when omitted
    ips: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build binary trie from provider data
    Build {
        /// Seed data from a directory of .txt files, replacing existing files
        #[arg(long, value_name = "DIR")]
        seed: Option<PathBuf>,
    },

    /// Add CIDR ranges to a provider
    Add {
        /// Provider name
        provider: String,

        /// Read CIDRs from a file (use '-' for stdin)
        #[arg(short, long, value_name = "FILE")]
        file: Option<String>,

        /// Rebuild binary trie after adding
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        build: bool,

        /// Overwrite an existing provider without asking
        #[arg(short, long)]
        yes: bool,

        /// CIDR ranges
        cidrs: Vec<String>,
    },

    /// Remove a provider and its ranges
    Remove {
        /// Provider name
        provider: String,

        /// Rebuild binary trie after removing
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        build: bool,
    },

    /// List providers and range counts
    List,

    /// Print version
    Version,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    if let Some(Commands::Version) = cli.command {
        println!("ip2cloud version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let store = match &cli.home {
        Some(home) => Store::new(home),
        None => Store::open_default()?,
    };

    match cli.command {
        None => lookup(&store, cli.lookup),
        Some(Commands::Build { seed }) => build(&store, seed),
        Some(Commands::Add {
            provider,
            file,
            build,
            yes,
            cidrs,
        }) => add(&store, &provider, file.as_deref(), cidrs, build, yes),
        Some(Commands::Remove { provider, build }) => remove(&store, &provider, build),
        Some(Commands::List) => list(&store),
        Some(Commands::Version) => Ok(()),
    }
}

fn print_warnings(trie: &Trie) {
    for warning in trie.warnings() {
        eprintln!("warning: {}", warning);
    }
}

fn lookup(store: &Store, args: LookupArgs) -> CliResult {
    let trie = store.load_or_build(args.seed.as_deref())?;
    print_warnings(&trie);
    if trie.owner_count() == 0 {
        log::warn!(
            "No providers loaded from {:?}; every lookup will miss. Seed with --seed <dir> or 'ip2cloud add'",
            store.data_dir
        );
    }

    let config = match args.workers {
        Some(workers) => PipelineConfig::with_workers(workers),
        None => PipelineConfig::default(),
    };
    let filter = args
        .provider
        .as_deref()
        .map(OwnerFilter::parse)
        .unwrap_or_default();
    let pipeline = LookupPipeline::with_config(&trie, config).with_filter(filter);
    log::debug!("Looking up with {} workers", pipeline.config().workers);

    // A read error still reports the matches resolved before it.
    let stdout = io::stdout();
    let result = if args.json {
        let mut report = GroupedReport::new();
        let result = feed(&pipeline, args.ips, |batch| report.extend(batch));
        report.write_json(stdout.lock())?;
        result
    } else {
        let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, stdout.lock());
        let mut write_err = None;
        let result = feed(&pipeline, args.ips, |batch| {
            if write_err.is_none() {
                if let Err(e) = write_plain(&mut out, &batch) {
                    write_err = Some(e);
                }
            }
        });
        if let Some(e) = write_err {
            return Err(e.into());
        }
        out.flush()?;
        result
    };

    let stats = result?;
    log::debug!("{:?}", stats);
    Ok(())
}

fn feed<F>(
    pipeline: &LookupPipeline<'_>,
    ips: Vec<String>,
    sink: F,
) -> ip2cloud::Result<ip2cloud::PipelineStats>
where
    F: FnMut(Vec<ip2cloud::Match>),
{
    if ips.is_empty() {
        pipeline.run_reader(BufReader::new(io::stdin()), sink)
    } else {
        Ok(pipeline.run_addrs(ips, sink))
    }
}

fn build(store: &Store, seed: Option<PathBuf>) -> CliResult {
    store.init()?;
    if let Some(dir) = seed {
        store.seed_from_dir(&dir, true)?;
    }

    let trie = store.build()?;
    print_warnings(&trie);
    println!(
        "Built trie: {} providers, saved to {}",
        trie.owner_count(),
        store.bin_path.display()
    );
    Ok(())
}

fn add(
    store: &Store,
    provider: &str,
    file: Option<&str>,
    mut cidrs: Vec<String>,
    rebuild: bool,
    yes: bool,
) -> CliResult {
    ip2cloud::store::validate_provider_name(provider)?;

    if let Some(file) = file {
        if file == "-" {
            read_cidrs(io::stdin().lock(), &mut cidrs)?;
        } else {
            let f = fs::File::open(file).map_err(|e| format!("opening {}: {}", file, e))?;
            read_cidrs(BufReader::new(f), &mut cidrs)?;
        }
    }

    if cidrs.is_empty() {
        return Err("no CIDRs provided. Use arguments, -f file, or -f - for stdin.".into());
    }

    if store.provider_exists(provider) {
        if !yes && !confirm(&format!(
            "Provider '{}' already exists. Overwrite? [y/N]: ",
            provider
        ))? {
            println!("Aborted.");
            return Ok(());
        }
        store.overwrite_ranges(provider, &cidrs)?;
        println!("Overwrote {} with {} ranges", provider, cidrs.len());
    } else {
        store.add_ranges(provider, &cidrs)?;
        println!("Added {} ranges to {}", cidrs.len(), provider);
    }

    if rebuild {
        let trie = store.build()?;
        print_warnings(&trie);
        println!("Rebuilt binary trie");
    }
    Ok(())
}

fn remove(store: &Store, provider: &str, rebuild: bool) -> CliResult {
    store.remove_provider(provider)?;
    println!("Removed provider '{}'", provider);

    if rebuild {
        let trie = store.build()?;
        print_warnings(&trie);
        println!("Rebuilt binary trie");
    }
    Ok(())
}

fn list(store: &Store) -> CliResult {
    let providers = store.list_providers()?;
    if providers.is_empty() {
        println!("No providers found. Run 'ip2cloud build --seed <dir>' to import data.");
        return Ok(());
    }

    let width = providers
        .iter()
        .map(|p| p.name.len())
        .chain(["PROVIDER".len(), "TOTAL".len()])
        .max()
        .unwrap_or(0);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{:<width$}  RANGES", "PROVIDER", width = width)?;
    let mut total = 0;
    for p in &providers {
        writeln!(out, "{:<width$}  {}", p.name, p.range_count, width = width)?;
        total += p.range_count;
    }
    writeln!(out)?;
    writeln!(out, "{:<width$}  {}", "TOTAL", total, width = width)?;
    Ok(())
}

fn read_cidrs<R: BufRead>(reader: R, cidrs: &mut Vec<String>) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            cidrs.push(line.to_string());
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
