mod logging;
mod settings;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use xeger_core::{Element, ElementTree};
use xeger_generate::{PatternError, SampleRequest, Xeger, XegerOptions, synthesize};

use logging::init_logging;
use settings::{Settings, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("pattern `{0}` has nothing that can be confounded")]
    NotConfoundable(String),
}

#[derive(Parser, Debug)]
#[command(name = "xeger", version, about = "Generate strings that match, or miss, a pattern")]
struct Cli {
    /// Settings file (defaults to ./xeger.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `xeger_generate=trace`.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print strings that match PATTERN, and optionally some that do not.
    Sample(SampleArgs),
    /// Print strings that PATTERN rejects.
    Confound(ConfoundArgs),
    /// Show the element tree built for PATTERN.
    Explain(ExplainArgs),
}

#[derive(Args, Debug)]
struct SampleArgs {
    pattern: String,
    /// Matching strings to print.
    #[arg(long)]
    count: Option<usize>,
    /// Non-matching strings to print.
    #[arg(long, default_value_t = 0)]
    invalid: usize,
    /// Never print the same string twice.
    #[arg(long, default_value_t = false)]
    distinct: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// Emissions tried per checked string.
    #[arg(long)]
    attempts: Option<u32>,
    #[arg(long)]
    min_len: Option<usize>,
    #[arg(long)]
    max_len: Option<usize>,
    /// Print the samples as a JSON document.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct ConfoundArgs {
    pattern: String,
    #[arg(long)]
    count: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ExplainArgs {
    pattern: String,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.log_level);
    init_logging(level, cli.log_json || settings.log_json)?;

    match cli.command {
        Command::Sample(args) => run_sample(args, &settings),
        Command::Confound(args) => run_confound(args, &settings),
        Command::Explain(args) => run_explain(args, &settings),
    }
}

fn seeded_rng(flag: Option<u64>, settings: &Settings) -> ChaCha8Rng {
    let seed = flag.or(settings.seed).unwrap_or_else(rand::random);
    tracing::info!(event = "rng_seeded", seed);
    ChaCha8Rng::seed_from_u64(seed)
}

fn engine_options(settings: &Settings, attempts: Option<u32>) -> Result<XegerOptions, CliError> {
    let mut options = settings.engine;
    if let Some(attempts) = attempts {
        if attempts == 0 {
            return Err(CliError::InvalidArgs(
                "--attempts must be at least 1".to_string(),
            ));
        }
        options.attempts = attempts;
    }
    Ok(options)
}

fn run_sample(args: SampleArgs, settings: &Settings) -> Result<(), CliError> {
    if let (Some(min), Some(max)) = (args.min_len, args.max_len)
        && min > max
    {
        return Err(CliError::InvalidArgs(format!(
            "--min-len {min} is greater than --max-len {max}"
        )));
    }

    let options = engine_options(settings, args.attempts)?;
    let xeger = Xeger::with_options(&args.pattern, options)?;
    let mut rng = seeded_rng(args.seed, settings);

    let request = SampleRequest {
        valid: args.count.unwrap_or(settings.count),
        invalid: args.invalid,
        min_len: args.min_len,
        max_len: args.max_len,
        distinct: args.distinct,
        ..SampleRequest::default()
    };
    let samples = synthesize(&xeger, &request, &mut rng);
    tracing::info!(
        event = "samples_generated",
        valid = samples.valid.len(),
        invalid = samples.invalid.len()
    );
    if !samples.is_complete(&request) {
        tracing::warn!(
            pattern = %args.pattern,
            confoundable = samples.confoundable,
            "fewer samples than requested"
        );
    }

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &samples)?;
        writeln!(out)?;
        return Ok(());
    }
    for text in &samples.valid {
        writeln!(out, "{text}")?;
    }
    for text in &samples.invalid {
        writeln!(out, "! {text}")?;
    }
    Ok(())
}

fn run_confound(args: ConfoundArgs, settings: &Settings) -> Result<(), CliError> {
    let xeger = Xeger::with_options(&args.pattern, settings.engine)?;
    let Some(confounded) = xeger.confound() else {
        return Err(CliError::NotConfoundable(args.pattern));
    };
    let mut rng = seeded_rng(args.seed, settings);
    let count = args.count.unwrap_or(settings.count);

    let mut out = io::stdout().lock();
    let mut printed = 0;
    for _ in 0..count {
        if let Some(text) = confounded.emit_checked(&mut rng) {
            writeln!(out, "{text}")?;
            printed += 1;
        }
    }
    if printed < count {
        tracing::warn!(pattern = %args.pattern, printed, count, "fewer samples than requested");
    }
    Ok(())
}

fn run_explain(args: ExplainArgs, settings: &Settings) -> Result<(), CliError> {
    let xeger = Xeger::with_options(&args.pattern, settings.engine)?;
    let mut out = io::stdout().lock();

    writeln!(out, "{xeger}")?;
    write_tree(&mut out, xeger.tree())?;
    for skipped in xeger.skipped() {
        writeln!(
            out,
            "skipped `{}` at offset {}",
            skipped.construct, skipped.offset
        )?;
    }

    match xeger.confound() {
        Some(confounded) => {
            writeln!(out, "{confounded}")?;
            write_tree(&mut out, confounded.tree())?;
        }
        None => writeln!(out, "no confounded form")?,
    }
    Ok(())
}

fn write_tree(out: &mut impl Write, tree: &ElementTree) -> io::Result<()> {
    let mut lines = Vec::new();
    tree.traverse(|depth, id, element| {
        lines.push(format!(
            "{:indent$}{id} {}{}",
            "",
            element.kind(),
            detail(element),
            indent = depth * 2 + 2
        ));
    });
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn detail(element: &Element) -> String {
    let negation = |negated: bool| if negated { " negated" } else { "" };
    match element {
        Element::Empty => String::new(),
        Element::Char { ch, negated } => format!(" {ch:?}{}", negation(*negated)),
        Element::Str { text, .. } => format!(" {text:?}"),
        Element::Range {
            start,
            end,
            negated,
        } => format!(" {start:?}..={end:?}{}", negation(*negated)),
        Element::Class {
            set,
            negated,
            repeat,
        } => {
            let repeat = repeat.map(|repeat| repeat.to_string()).unwrap_or_default();
            format!(" [{set}]{repeat}{}", negation(*negated))
        }
        Element::Shorthand { source, .. } => format!(" {source}"),
        Element::Sequence { selection, .. } => format!(" {selection:?}"),
        Element::Capture { index, .. } => format!(" ${index}"),
        Element::Backref { group } => format!(" \\{group}"),
        Element::Bounds { repeat, .. } => format!(" {repeat}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sample_flags_parse() {
        let cli = Cli::try_parse_from([
            "xeger",
            "--log-json",
            "sample",
            "[a-z]{3}",
            "--count",
            "4",
            "--invalid",
            "2",
            "--seed",
            "7",
            "--json",
        ])
        .unwrap();
        assert!(cli.log_json);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.pattern, "[a-z]{3}");
        assert_eq!(args.count, Some(4));
        assert_eq!(args.invalid, 2);
        assert_eq!(args.seed, Some(7));
        assert!(args.json && !args.distinct);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli =
            Cli::try_parse_from(["xeger", "explain", "a+", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Explain(_)));
    }

    #[test]
    fn zero_attempts_are_refused() {
        let settings = Settings::default();
        assert!(matches!(
            engine_options(&settings, Some(0)),
            Err(CliError::InvalidArgs(_))
        ));
        assert_eq!(engine_options(&settings, Some(9)).unwrap().attempts, 9);
        assert_eq!(engine_options(&settings, None).unwrap(), settings.engine);
    }

    #[test]
    fn tree_listing_indents_by_depth() {
        let xeger = Xeger::new("(ab|c)\\1").unwrap();
        let mut out = Vec::new();
        write_tree(&mut out, xeger.tree()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"ab\""), "{text}");
        assert!(text.contains("\\1"), "{text}");
        let depths: Vec<usize> = text
            .lines()
            .map(|line| line.len() - line.trim_start().len())
            .collect();
        assert_eq!(depths[0], 2);
        assert!(depths.iter().any(|depth| *depth > 2));
    }
}
