use std::{
    collections::BTreeSet,
    fs,
    io::Read,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use org_data::{Config, OrgData, OrgFile, Severity, format_org_file, lint_org_data, parse_org_data};
use tracing_subscriber::EnvFilter;

const STDIN: &str = "-";

#[derive(Debug, Parser)]
#[command(
    name = "org",
    about = "Parse, reformat and lint org-mode outlines",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    /// TOML file overriding keywords, columns and transitions.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse Org files and print their structure.
    Parse(ParseArgs),

    /// Reprint Org files with aligned tags and properties.
    Format(FormatArgs),

    /// Report structural and task-state problems.
    Lint(LintArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Org files, directories containing Org files, or `-` for stdin.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of a debug representation.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FormatArgs {
    /// Org files, directories containing Org files, or `-` for stdin.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Overwrite the file instead of printing to stdout.
    #[arg(long)]
    in_place: bool,
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Org files, directories containing Org files, or `-` for stdin.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Lowest severity to report (DEBUG, INFO, WARN, ERROR).
    #[arg(long, default_value = "INFO")]
    severity: Severity,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {:?}", path))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Parse(args) => handle_parse(&config, args),
        Commands::Format(args) => handle_format(&config, args),
        Commands::Lint(args) => handle_lint(&config, args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse every input, reporting unparsable files on stderr. The flag is set when
/// at least one file failed.
fn load(config: &Config, inputs: &[PathBuf]) -> Result<(OrgData, bool)> {
    let sources = read_inputs(inputs)?;
    if sources.is_empty() {
        anyhow::bail!("no Org files found in the provided inputs");
    }
    let (data, errors) = parse_org_data(config, sources);
    for err in &errors {
        eprintln!("{err}");
    }
    Ok((data, !errors.is_empty()))
}

fn status(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn handle_parse(config: &Config, args: ParseArgs) -> Result<ExitCode> {
    let ParseArgs { inputs, json } = args;
    let (data, failed) = load(config, &inputs)?;
    let parsed: Vec<&OrgFile> = data.files.values().collect();

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            org: &'a OrgFile,
        }

        let payload: Vec<JsonOutput<'_>> = parsed
            .iter()
            .map(|file| JsonOutput {
                path: file.path.display().to_string(),
                org: file,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (idx, file) in parsed.iter().enumerate() {
            if parsed.len() > 1 {
                println!("== {} ==", file.path.display());
            }
            println!("{:#?}", file);
            if parsed.len() > 1 && idx + 1 < parsed.len() {
                println!();
            }
        }
    }
    Ok(status(failed))
}

fn handle_format(config: &Config, args: FormatArgs) -> Result<ExitCode> {
    let FormatArgs { inputs, in_place } = args;
    let (data, failed) = load(config, &inputs)?;
    let many = data.files.len() > 1;
    let mut first = true;

    for file in data.files.values() {
        tracing::debug!(path = %file.path.display(), "formatting");
        let formatted = format_org_file(config, file);

        if in_place && file.path.as_os_str() != STDIN {
            fs::write(&file.path, formatted.as_bytes())
                .with_context(|| format!("writing {:?}", file.path))?;
        } else {
            if !first {
                println!();
            }
            if many {
                println!("== {} ==", file.path.display());
            }
            first = false;
            print!("{formatted}");
        }
    }

    Ok(status(failed))
}

fn handle_lint(config: &Config, args: LintArgs) -> Result<ExitCode> {
    let LintArgs { inputs, severity } = args;
    let (data, failed) = load(config, &inputs)?;

    let messages = lint_org_data(config, severity, &data);
    for message in &messages {
        println!("{message}");
    }
    let errors = messages
        .iter()
        .any(|m| m.severity == Severity::Error);
    tracing::debug!(count = messages.len(), "lint messages reported");
    Ok(status(failed || errors))
}

/// `(path, content)` for every input; `-` reads stdin once, first. A file reached
/// both directly and through a directory is read once.
fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    if inputs.iter().any(|p| p.as_os_str() == STDIN) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        out.push((PathBuf::from(STDIN), text));
    }

    let mut seen = BTreeSet::new();
    for input in inputs.iter().filter(|p| p.as_os_str() != STDIN) {
        for path in org_files_under(input)? {
            if !seen.insert(path.clone()) {
                continue;
            }
            let text = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            out.push((path, text));
        }
    }
    Ok(out)
}

/// The input itself when it is an `.org` file, else every `.org` file below it,
/// sorted. Symlinks inside directories are not followed.
fn org_files_under(input: &Path) -> Result<Vec<PathBuf>> {
    let root = fs::canonicalize(input).with_context(|| format!("resolving path {:?}", input))?;
    if !root.is_dir() {
        anyhow::ensure!(is_org_file(&root), "{:?} is not an .org file", root);
        tracing::debug!(file = ?root, "adding file");
        return Ok(vec![root]);
    }

    let mut found = Vec::new();
    let mut pending = vec![root];
    while let Some(dir) = pending.pop() {
        tracing::debug!(dir = ?dir, "scanning directory");
        for entry in fs::read_dir(&dir).with_context(|| format!("listing {:?}", dir))? {
            let entry = entry?;
            let kind = entry.file_type()?;
            let path = entry.path();
            if kind.is_dir() {
                pending.push(path);
            } else if kind.is_file() && is_org_file(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_org_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "org")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directories_are_scanned_recursively_for_org_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        let nested = root.join("projects/2024");
        fs::create_dir_all(&nested).expect("mkdir nested");
        fs::write(root.join("inbox.org"), "* Inbox\n").expect("write inbox");
        fs::write(nested.join("plan.org"), "* Plan\n").expect("write plan");
        fs::write(root.join("notes.txt"), "not org").expect("write txt");

        let found = org_files_under(root).expect("scan");
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"inbox.org".to_string()));
        assert!(names.contains(&"plan.org".to_string()));
    }

    #[test]
    fn inputs_are_read_once() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("inbox.org");
        fs::write(&file, "* Inbox\n").expect("write inbox");

        let sources = read_inputs(&[file.clone(), tmp.path().to_path_buf(), file.clone()])
            .expect("read");
        assert_eq!(
            sources,
            vec![(fs::canonicalize(&file).expect("canonical"), "* Inbox\n".to_string())]
        );
    }

    #[test]
    fn explicit_non_org_file_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("notes.txt");
        fs::write(&file, "text").expect("write txt");
        assert!(org_files_under(&file).is_err());
        assert!(org_files_under(&tmp.path().join("missing.org")).is_err());
    }

    #[test]
    fn unparsable_files_are_reported_not_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("good.org"), "* Good\n").expect("write good");
        fs::write(tmp.path().join("bad.org"), "* Bad\n*** Too deep\n").expect("write bad");

        let (data, failed) =
            load(&Config::default(), &[tmp.path().to_path_buf()]).expect("load");
        assert!(failed);
        assert_eq!(data.files.len(), 1);
    }

    #[test]
    fn severity_flag_parses_tokens() {
        let cli = Cli::try_parse_from(["org", "lint", "--severity", "warn", "a.org"])
            .expect("parse args");
        match cli.command {
            Commands::Lint(args) => assert_eq!(args.severity, Severity::Warn),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["org", "lint", "--severity", "loud", "a.org"]).is_err());
    }
}
