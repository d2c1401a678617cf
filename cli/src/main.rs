mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use renderer::{
    CollaboratorError, CommandHighlighter, CommandMathRenderer, Highlighter, MathBatch,
    MathRenderer, PlainHighlighter, RenderDiagnostic,
};

const SUBCOMMANDS: &[&str] = &["build", "test", "help"];

#[derive(Parser)]
#[command(name = "folio", version, about = "Writing post generator")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build HTML fragments from markdown sources
    Build(BuildArgs),

    /// Run .test.md golden test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Optional list of slugs or markdown file paths to process
    targets: Vec<String>,

    /// Directory containing writing markdown sources
    #[arg(long, default_value = "content/writing")]
    content_dir: String,

    /// Directory for generated HTML fragments
    #[arg(long, default_value = "_content/writing")]
    output_dir: String,

    /// Render everything but write nothing; reports all failures
    #[arg(long)]
    check: bool,

    /// External highlighter command (language appended, code on stdin);
    /// escaped plain text is used when unset
    #[arg(long)]
    highlight_cmd: Option<String>,

    /// External TeX-to-SVG command (TeX on stdin); documents with display
    /// math fail without one
    #[arg(long)]
    math_cmd: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "build" so `folio my-post` works like
    // `folio build my-post`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Build(build_args) => do_build(build_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// A math renderer for builds run without `--math-cmd`: documents with no
/// display math never reach it, and documents with math fail fatally.
struct UnconfiguredMathRenderer;

impl MathRenderer for UnconfiguredMathRenderer {
    fn render_batch(&mut self, _expressions: &[String]) -> Result<MathBatch, CollaboratorError> {
        Err(CollaboratorError(
            "no math renderer configured; pass --math-cmd".to_string(),
        ))
    }
}

fn do_build(args: BuildArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    let content_dir = Path::new(&args.content_dir);
    let output_dir = Path::new(&args.output_dir);

    let targets = match resolve_targets(&args.targets, content_dir) {
        Ok(t) => t,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(1);
        }
    };
    if targets.is_empty() {
        eprintln!(
            "error: no markdown files found in '{}'",
            content_dir.display()
        );
        process::exit(1);
    }

    let highlighter: Box<dyn Highlighter> = match &args.highlight_cmd {
        Some(command) => Box::new(CommandHighlighter::new(command)),
        None => Box::new(PlainHighlighter),
    };

    let mut files = SimpleFiles::new();
    let mut any_failed = false;

    for path in &targets {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", path.display(), e);
                process::exit(1);
            }
        };
        let file_id = files.add(path.display().to_string(), source.clone());

        let parser = folio::parser::Parser::new(source, file_id);
        let post = match parser.parse() {
            Ok(p) => p,
            Err(error) => {
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &config,
                    &files,
                    &error.to_diagnostic(),
                );
                if args.check {
                    any_failed = true;
                    continue;
                }
                process::exit(1);
            }
        };

        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Some(slug) = folio::slug::sanitize(post.metadata.get("slug"), fallback) else {
            eprintln!("error: {}: slug cannot be empty", path.display());
            if args.check {
                any_failed = true;
                continue;
            }
            process::exit(1);
        };

        // Fresh per document, so any glyph cache resets between documents.
        let mut math: Box<dyn MathRenderer> = match &args.math_cmd {
            Some(command) => Box::new(CommandMathRenderer::new(command)),
            None => Box::new(UnconfiguredMathRenderer),
        };

        let (html, warnings) = match renderer::render_post(&post, highlighter.as_ref(), math.as_mut())
        {
            Ok(pair) => pair,
            Err(diagnostic) => {
                emit_render_diagnostic(&writer, &config, &files, &diagnostic);
                if args.check {
                    any_failed = true;
                    continue;
                }
                process::exit(1);
            }
        };
        for warning in &warnings {
            emit_render_diagnostic(&writer, &config, &files, warning);
        }

        if args.check {
            continue;
        }

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            eprintln!("error: cannot create '{}': {}", output_dir.display(), e);
            process::exit(1);
        }
        let output_path = output_dir.join(format!("{}.html", slug));
        if let Err(e) = std::fs::write(&output_path, html) {
            eprintln!("error: cannot write '{}': {}", output_path.display(), e);
            process::exit(1);
        }
        println!("Wrote {}", output_path.display());
    }

    if any_failed {
        process::exit(1);
    }
}

/// Resolve CLI targets to markdown files. Explicit paths are used as-is;
/// bare slugs resolve against the content directory. No targets means
/// every `*.md` in the content directory, sorted.
fn resolve_targets(targets: &[String], content_dir: &Path) -> Result<Vec<PathBuf>, String> {
    if targets.is_empty() {
        let entries = std::fs::read_dir(content_dir)
            .map_err(|e| format!("cannot read '{}': {}", content_dir.display(), e))?;
        let mut found: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md")
            })
            .collect();
        found.sort();
        return Ok(found);
    }

    let mut resolved = Vec::new();
    for target in targets {
        let mut candidate = PathBuf::from(target);
        if candidate.is_file() {
            resolved.push(candidate);
            continue;
        }
        if candidate.extension().and_then(|e| e.to_str()) != Some("md") {
            candidate = content_dir.join(format!("{}.md", target));
        }
        if !candidate.is_file() {
            return Err(format!("cannot locate markdown file for '{}'", target));
        }
        resolved.push(candidate);
    }
    Ok(resolved)
}

fn emit_render_diagnostic(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostic: &RenderDiagnostic,
) {
    if let Some(span) = &diagnostic.span {
        let severity = if diagnostic.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let rendered = Diagnostic::new(severity)
            .with_message(diagnostic.to_string())
            .with_labels(vec![Label::primary(diagnostic.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &rendered);
    } else {
        let prefix = if diagnostic.is_warning {
            "warning"
        } else {
            "error"
        };
        eprintln!("{}: {}", prefix, diagnostic);
    }
}
