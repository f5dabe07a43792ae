mod test_runner;
mod watch;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use engine::handle::{NodePath, encode};
use outline::Outline;
use outline::block::{Block, List};
use outline::parser::{ParseError, Parsed};

const SUBCOMMANDS: &[&str] = &["show", "reparent", "rename", "watch", "test", "help"];

#[derive(Parser)]
#[command(name = "outline", version, about = "Markdown outline mind-map engine")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the handle-annotated structural tree of an outline
    Show(ShowArgs),

    /// Move a node under another node and print the resulting text
    Reparent(ReparentArgs),

    /// Change a node's text and print the resulting text
    Rename(RenameArgs),

    /// Watch a file and re-print its tree after each settled change
    Watch(WatchArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Outline source file
    file: String,

    /// Parse only, don't print the tree (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct ReparentArgs {
    /// Outline source file
    file: String,

    /// Handle of the node being moved (e.g. mm-1-2)
    dragged: String,

    /// Handle of the new parent
    target: String,

    /// Relation to the target (only "child" is supported)
    #[arg(short, long, default_value = "child")]
    relation: String,

    /// Write the result back to the file instead of stdout
    #[arg(short, long)]
    in_place: bool,
}

#[derive(clap::Args)]
struct RenameArgs {
    /// Outline source file
    file: String,

    /// Handle of the node to rename
    handle: String,

    /// The node's current text (diagnostic aid and legacy fallback key)
    original: String,

    /// The replacement text
    new: String,

    /// Write the result back to the file instead of stdout
    #[arg(short, long)]
    in_place: bool,
}

#[derive(clap::Args)]
struct WatchArgs {
    /// Outline source file
    file: String,

    /// Quiet window in milliseconds before a change burst is processed
    #[arg(long, default_value_t = watch::DEFAULT_QUIET_MS)]
    quiet_ms: u64,
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
    env_logger::init();

    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "show" so `outline file.md` works like
    // `outline show file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "show".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Show(show_args) => do_show(show_args, cli.no_color),
        Command::Reparent(args) => {
            let ReparentArgs { file, dragged, target, relation, in_place } = args;
            apply_edit(&file, in_place, |source| {
                engine::reparent(source, &dragged, &target, &relation).map(|result| {
                    if result.clear_selection {
                        log::info!("selection cleared: handles from the old snapshot are stale");
                    }
                    (result.text, Vec::new())
                })
            });
        }
        Command::Rename(args) => {
            let RenameArgs { file, handle, original, new, in_place } = args;
            apply_edit(&file, in_place, |source| {
                engine::rename(source, &handle, &original, &new)
                    .map(|result| (result.text, result.warnings))
            });
        }
        Command::Watch(args) => do_watch(args, cli.no_color),
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

fn read_source(file: &str) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    }
}

fn do_show(args: ShowArgs, no_color: bool) {
    let source = read_source(&args.file);

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let Parsed { outline, warnings } =
        outline::parser::Parser::new(source, file_id).parse();
    emit_warnings(&files, &warnings, no_color);

    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    print_tree(&outline);
}

/// Run an edit operation against a file and write out the result.
///
/// On failure the document is untouched; the diagnostic goes to stderr and
/// the original text is still what the caller has. A `Reconstruction`
/// failure prints the recovered text so downstream consumers of stdout
/// always see valid outline source.
fn apply_edit<F>(file: &str, in_place: bool, op: F)
where
    F: FnOnce(&str) -> Result<(String, Vec<engine::EditWarning>), engine::EditError>,
{
    let source = read_source(file);

    match op(&source) {
        Ok((text, warnings)) => {
            for warning in &warnings {
                eprintln!("warning: {}", warning);
            }
            if in_place {
                if let Err(e) = std::fs::write(file, &text) {
                    eprintln!("error: cannot write '{}': {}", file, e);
                    process::exit(1);
                }
            } else {
                print!("{}", text);
            }
        }
        Err(err) => {
            eprintln!("error: {}", err);
            if !in_place {
                match err {
                    engine::EditError::Reconstruction { recovered } => print!("{}", recovered),
                    _ => print!("{}", source),
                }
            }
            process::exit(1);
        }
    }
}

fn do_watch(args: WatchArgs, no_color: bool) {
    let path = Path::new(&args.file).to_path_buf();
    let file = args.file.clone();

    let result = watch::watch_file(&path, args.quiet_ms, |content| {
        let mut files = SimpleFiles::new();
        let file_id = files.add(file.clone(), content.to_string());
        let Parsed { outline, warnings } =
            outline::parser::Parser::new(content.to_string(), file_id).parse();
        emit_warnings(&files, &warnings, no_color);
        println!("--- {} ---", file);
        print_tree(&outline);
    });

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Print every structural node with the handle the renderer would assign
/// it, indented by nesting depth.
fn print_tree(outline: &Outline) {
    let mut index = 0;
    for block in &outline.blocks {
        match block {
            Block::Heading(h) => {
                println!(
                    "{}  {} {}",
                    encode(&NodePath(vec![index])),
                    "#".repeat(h.level as usize),
                    h.text
                );
                index += 1;
            }
            Block::List(l) => {
                print_list(l, &[index]);
                index += 1;
            }
            Block::Paragraph(_) => {}
        }
    }
}

fn print_list(list: &List, prefix: &[usize]) {
    for (i, item) in list.items.iter().enumerate() {
        let mut path = prefix.to_vec();
        path.push(i);
        let indent = "  ".repeat(path.len() - 1);
        println!("{}  {}- {}", encode(&NodePath(path.clone())), indent, item.text);
        if let Some(nested) = &item.nested {
            print_list(nested, &path);
        }
    }
}

fn emit_warnings(
    files: &SimpleFiles<String, String>,
    warnings: &[ParseError],
    no_color: bool,
) {
    if warnings.is_empty() {
        return;
    }
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for warning in warnings {
        let diagnostic = warning.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}
