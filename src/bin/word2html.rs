//! CLI binary for edgequake-word2html.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, `format`
//! lays out one local file and writes the HTML next to the configured output
//! directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_word2html::pipeline::input;
use edgequake_word2html::prompts::DEFAULT_RULES;
use edgequake_word2html::{format_to_file, Relay, Server, Settings};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 8000
  word2html serve

  # Use a specific config file and port
  word2html serve --config /etc/word2html/config.yaml --port 9000

  # Format a Word document with the default rules
  word2html format report.docx

  # Custom rules, Word-compatible output
  word2html format notes.txt --rules "标题黑体二号居中，正文仿宋三号" --word -o notes.doc

  # Rules kept in a file
  word2html format contract.docx --rules-file rules.txt

CONFIGURATION:
  Settings are read from config.yaml (or --config), then overridden by the
  environment. Only non-empty values override.

ENVIRONMENT VARIABLES:
  LLM_API_KEY           API key for the OpenAI-compatible endpoint
  LLM_BASE_URL          Endpoint base URL (default https://api.openai.com/v1)
  LLM_STREAM_MODEL      Model used for streaming requests
  LLM_NON_STREAM_MODEL  Model used for batch requests
  LLM_TEMPERATURE       Sampling temperature (0.0–2.0)
  LLM_TIMEOUT           Upstream timeout in seconds
  LOG_DIR               Directory for saved model responses
  OUTPUT_DIR            Default directory for `format` output
  UPLOAD_DIR            Spool directory for Word uploads
  DEBUG                 "true" enables debug logging
  PORT                  Listen port for `serve`
  RUST_LOG              Full tracing filter, overrides -v/-q
"#;

/// Format text and Word documents into styled HTML with a chat model.
#[derive(Parser, Debug)]
#[command(
    name = "word2html",
    version,
    about = "Format text and Word documents into styled HTML with a chat model",
    long_about = "Send plain text or a .docx body, together with free-form layout rules, to an \
OpenAI-compatible chat model and turn the answer into a complete, Word-compatible HTML document. \
Runs either as an HTTP API (serve) or on a single local file (format).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "WORD2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "WORD2HTML_QUIET")]
    quiet: bool,

    /// Path to the YAML configuration file.
    #[arg(long, global = true, env = "WORD2HTML_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Bind address (overrides server.host).
        #[arg(long, env = "WORD2HTML_HOST")]
        host: Option<String>,

        /// Bind port (overrides server.port).
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Format one local file.
    Format {
        /// Text file (UTF-8, GBK, GB18030, …) or .docx document.
        input: PathBuf,

        /// Output path. Default: {output_dir}/{stem}.html, or .doc with --word.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Formatting rules in natural language.
        #[arg(long, conflicts_with = "rules_file")]
        rules: Option<String>,

        /// Read the formatting rules from this file.
        #[arg(long)]
        rules_file: Option<PathBuf>,

        /// Add Word meta tags so the output opens as a Word document.
        #[arg(long)]
        word: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose || settings.app.debug {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            settings.validate().context("Invalid configuration")?;

            let server = Server::from_settings(settings).context("Failed to build the relay")?;
            if !cli.quiet {
                eprintln!("{} {}", green("◆"), bold(&format!("word2html listening on {}", server.addr())));
            }
            server.run().await.context("Server failed")?;
        }
        Command::Format {
            input: input_path,
            output,
            rules,
            rules_file,
            word,
        } => {
            settings.validate().context("Invalid configuration")?;
            let rules = resolve_rules(rules, rules_file.as_deref())?;
            let output_path =
                output.unwrap_or_else(|| default_output_path(&settings.app.output_dir, &input_path, word));
            run_format(&settings, &input_path, &output_path, &rules, word, cli.quiet).await?;
        }
    }

    Ok(())
}

async fn run_format(
    settings: &Settings,
    input_path: &Path,
    output_path: &Path,
    rules: &str,
    word: bool,
    quiet: bool,
) -> Result<()> {
    let start = Instant::now();
    let bytes = tokio::fs::read(input_path)
        .await
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let filename = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = input::extract_content(bytes, &filename, settings.app.upload_temp_dir())
        .await
        .with_context(|| format!("Failed to extract text from {}", input_path.display()))?;

    let relay = Relay::from_settings(settings).context("Failed to build the relay")?;
    let formatted = format_to_file(&relay, text.trim(), rules, output_path, word)
        .await
        .context("Formatting failed")?;

    if !quiet {
        for issue in &formatted.document.errors {
            eprintln!("{} {}", yellow("⚠"), issue);
        }
        eprintln!(
            "{}  {} chars  {}ms  →  {}",
            if formatted.document.valid { green("✔") } else { yellow("⚠") },
            formatted.document.html.chars().count(),
            start.elapsed().as_millis(),
            bold(&output_path.display().to_string()),
        );
        eprintln!("   response log: {}", dim(&formatted.log_file));
    }
    Ok(())
}

fn resolve_rules(rules: Option<String>, rules_file: Option<&Path>) -> Result<String> {
    if let Some(path) = rules_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        return Ok(raw.trim().to_string());
    }
    Ok(rules.unwrap_or_else(|| DEFAULT_RULES.to_string()))
}

fn default_output_path(output_dir: &str, input: &Path, word: bool) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = if word { "doc" } else { "html" };
    Path::new(output_dir).join(format!("{stem}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_uses_stem_and_mode() {
        assert_eq!(
            default_output_path("outputs", Path::new("/tmp/报告.docx"), false),
            PathBuf::from("outputs/报告.html")
        );
        assert_eq!(
            default_output_path("out", Path::new("notes.txt"), true),
            PathBuf::from("out/notes.doc")
        );
    }

    #[test]
    fn rules_default_when_not_given() {
        assert_eq!(resolve_rules(None, None).unwrap(), DEFAULT_RULES);
        assert_eq!(resolve_rules(Some("居中".into()), None).unwrap(), "居中");
    }

    #[test]
    fn rules_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, "  正文宋体\n".as_bytes()).unwrap();
        assert_eq!(resolve_rules(None, Some(file.path())).unwrap(), "正文宋体");
    }

    #[test]
    fn cli_parses_format_subcommand() {
        let cli = Cli::parse_from(["word2html", "format", "a.docx", "--word", "-o", "x.doc"]);
        match cli.command {
            Command::Format { input, output, word, .. } => {
                assert_eq!(input, PathBuf::from("a.docx"));
                assert_eq!(output, Some(PathBuf::from("x.doc")));
                assert!(word);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rules_and_rules_file_conflict() {
        let res = Cli::try_parse_from([
            "word2html", "format", "a.txt", "--rules", "x", "--rules-file", "r.txt",
        ]);
        assert!(res.is_err());
    }
}
