use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anstyle::{AnsiColor, Style};
use clap::{CommandFactory, Parser};
use log::{debug, warn};

use shrun::config_file::{self, FILENAMES, RunConfig};
use shrun::exec::{self, ExecError};
use shrun::shell::{Host, SystemHost};

const ERROR_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const NOTICE_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));
const SUCCESS_STYLE: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));

/// Editors tried, in order, when `EDITOR` is not set
const EDITORS: [&str; 3] = ["nvim", "vim", "nano"];

#[derive(Parser, Debug)]
#[command(
    name = "run",
    about = "Run nested shell commands defined in run.yml",
    override_usage = "run [OPTIONS] <COMMAND>...",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Show this help message
    #[arg(short, long)]
    help: bool,

    /// Show the version of the package
    #[arg(short, long)]
    version: bool,

    /// Create a run.yml config file in the current directory
    #[arg(short, long)]
    init: bool,

    /// Edit the per-user run.yml file
    #[arg(short, long)]
    edit: bool,

    /// Log file path (log records are written there in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Command to run, followed by its sub-commands
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn color() -> bool {
    std::io::stdout().is_terminal()
}

fn styled(style: Style, text: &str) -> String {
    if color() {
        format!("{}{text}{}", style.render(), style.render_reset())
    } else {
        text.to_string()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match cli.log_file.as_ref().map(std::fs::File::create).transpose() {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{} {e}", styled(ERROR_STYLE, "Error:"));
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = shrun::logger::init(log_file) {
        eprintln!("Logger not initialized: {e}");
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", styled(ERROR_STYLE, "Error:"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.help {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }
    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }
    if cli.init {
        generate_config_file(Path::new(FILENAMES[0]))?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.edit {
        return edit_system_config();
    }
    if cli.command.is_empty() {
        println!("{}", styled(ERROR_STYLE, "No command provided."));
        print_usage();
        return Ok(ExitCode::FAILURE);
    }

    let Some(config) = load_config()? else {
        return Ok(ExitCode::FAILURE);
    };
    match exec::run(&config, cli.command, &mut SystemHost) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(report(&e)),
    }
}

/// The outermost boundary for run-time errors: every error ends the process with a message.
fn report(e: &ExecError) -> ExitCode {
    debug!("Aborting: {e:?}");
    eprintln!("{} {e}", styled(ERROR_STYLE, "Error:"));
    ExitCode::from(e.exit_code())
}

/// Loads the merged configuration; `None` once the missing-config hints have been printed.
fn load_config() -> Result<Option<RunConfig>, Box<dyn std::error::Error>> {
    match shrun::load_default_config() {
        Err(config_file::ConfigError::NoConfig) => {
            eprintln!(
                "{}",
                styled(
                    ERROR_STYLE,
                    &format!("No configuration file found: {}", FILENAMES[0])
                )
            );
            eprintln!("run `run --init` to generate project level config or");
            eprintln!("run `run --edit` to generate and edit system level config");
            Ok(None)
        }
        other => Ok(Some(other?)),
    }
}

fn print_usage() {
    println!("shrun {}", env!("CARGO_PKG_VERSION"));
    let help = Cli::command().render_help();
    if color() {
        println!("{}", help.ansi());
    } else {
        println!("{help}");
    }
    match shrun::load_default_config() {
        Ok(config) => print!("{}", config.root.usage(color())),
        Err(e) => debug!("No commands to list: {e}"),
    }
}

fn generate_config_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if shrun::init::generate_config_file(path)? {
        println!(
            "{}",
            styled(
                SUCCESS_STYLE,
                &format!("Configuration file generated at {}", path.display())
            )
        );
    } else {
        println!(
            "{}",
            styled(
                NOTICE_STYLE,
                &format!("Configuration file already exists: {}", path.display())
            )
        );
    }
    Ok(())
}

fn find_editor() -> Option<String> {
    if let Some(editor) = SystemHost.var("EDITOR").filter(|e| !e.trim().is_empty()) {
        return Some(editor);
    }
    EDITORS
        .iter()
        .find(|name| which::which(name).is_ok())
        .map(ToString::to_string)
}

fn edit_system_config() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(editor) = find_editor() else {
        eprintln!(
            "{}",
            styled(
                ERROR_STYLE,
                "No editor found. Please set the EDITOR environment variable."
            )
        );
        return Ok(ExitCode::FAILURE);
    };
    let path = config_file::system_config_path()?;
    generate_config_file(&path)?;
    let Some(dir) = path.parent() else {
        return Ok(ExitCode::FAILURE);
    };
    let status = SystemHost.run(&format!("{editor} \"{}\"", dir.display()), None)?;
    if status != 0 {
        warn!("{editor} exited with status {status}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
