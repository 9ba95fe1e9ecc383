use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for emu-front")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Library areas with their own test filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Area {
    Input,
    Program,
    Emulator,
    Audio,
    Settings,
}

impl Area {
    fn filter(self) -> &'static str {
        match self {
            Area::Input => "input::",
            Area::Program => "program::",
            Area::Emulator => "emulator::",
            Area::Audio => "audio::",
            Area::Settings => "settings::",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks (fmt, clippy, build, test)
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Run tests
    Test {
        /// Only doc tests
        #[arg(long)]
        doc: bool,
        /// Only the integration tests under tests/
        #[arg(long)]
        integration: bool,
        /// Library areas to test, e.g. `--area input --area program`
        #[arg(long, value_enum)]
        area: Vec<Area>,
    },
    /// Run benchmarks
    Bench {
        /// Single benchmark target (input_bench, rewind_bench)
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the headless front-end against a game file
    Smoke {
        game: String,
        #[arg(short = 'n', long, default_value = "600")]
        frames: u64,
        #[arg(long)]
        release: bool,
    },
    /// Pre-commit hook (fmt, clippy, test)
    PreCommit,
    /// Install git hooks
    InstallHooks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => pipeline("CI", verbose, true),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Test {
            doc,
            integration,
            area,
        } => run_test(doc, integration, &area),
        Commands::Bench { name } => run_bench(name.as_deref()),
        Commands::Smoke {
            game,
            frames,
            release,
        } => run_smoke(&game, frames, release),
        Commands::PreCommit => pipeline("Pre-commit", false, false),
        Commands::InstallHooks => install_hooks(),
    }
}

/// `cargo <subcommand>` with the feature selection for this machine
///
/// CI runners have no ALSA headers, so the cpal backend is left out there.
fn cargo(subcommand: &str) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg(subcommand);
    if std::env::var("CI").is_ok() {
        cmd.arg("--no-default-features");
    } else {
        cmd.arg("--all-features");
    }
    cmd
}

fn pipeline(name: &str, verbose: bool, build: bool) -> Result<()> {
    println!("{}", format!("=== {} ===", name).bold().blue());
    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    if build {
        run_task("Build", || execute_command(&mut cargo("build")), verbose)?;
    }
    run_task("Test", || run_test(false, false, &[]), verbose)?;

    println!(
        "\n{} {}",
        format!("✓ {} passed in", name).green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["fmt", "--all"]);
    if check {
        cmd.args(["--", "--check"]);
    }
    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = cargo("clippy");
    cmd.arg("--all-targets");
    if fix {
        cmd.arg("--fix");
    } else {
        cmd.args(["--", "-D", "warnings"]);
    }
    execute_command(&mut cmd)
}

fn run_test(doc: bool, integration: bool, areas: &[Area]) -> Result<()> {
    if doc {
        let mut cmd = cargo("test");
        cmd.arg("--doc");
        return execute_command(&mut cmd);
    }
    if integration {
        let mut cmd = cargo("test");
        cmd.args(["--test", "*"]);
        return execute_command(&mut cmd);
    }
    if areas.is_empty() {
        return execute_command(&mut cargo("test"));
    }

    let mut failed = Vec::new();
    for &area in areas {
        println!("{} Running {:?} tests...", "→".blue(), area);
        let mut cmd = cargo("test");
        cmd.args(["--lib", area.filter()]);
        match execute_command(&mut cmd) {
            Ok(()) => println!("{} {:?} tests passed\n", "✓".green(), area),
            Err(_) => {
                println!("{} {:?} tests failed\n", "✗".red(), area);
                failed.push(area);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("tests failed in {:?}", failed)
    }
}

fn run_bench(name: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("bench");
    if let Some(name) = name {
        cmd.args(["--bench", name]);
    }
    execute_command(&mut cmd)
}

fn run_smoke(game: &str, frames: u64, release: bool) -> Result<()> {
    println!("{}", "=== Smoke Run ===".bold().blue());

    if !std::path::Path::new(game).exists() {
        println!("{} Game file not found: {}", "✗".red().bold(), game.yellow());
        anyhow::bail!("game file not found");
    }
    println!("{} {} for {} frames", "→".blue(), game.cyan(), frames.to_string().bold());

    let start = Instant::now();
    let mut cmd = Command::new("cargo");
    cmd.arg("run");
    if release {
        cmd.arg("--release");
    }
    cmd.args(["--", game, "--fast-forward", "--no-audio", "--frames"])
        .arg(frames.to_string());
    execute_command(&mut cmd)?;

    println!(
        "\n{} Smoke run completed in {}",
        "✓".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn install_hooks() -> Result<()> {
    use std::fs;

    let hook = "#!/bin/sh\n# Generated by cargo x install-hooks\nset -e\ncargo x pre-commit\n";
    let path = ".git/hooks/pre-commit";
    fs::write(path, hook)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    println!("{}", "✓ Git hooks installed (fmt, clippy, test)".green());
    Ok(())
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);
    let start = Instant::now();

    match task() {
        Ok(()) => {
            let elapsed = if verbose {
                format!("({:.2}s)", start.elapsed().as_secs_f64())
            } else {
                String::new()
            };
            println!("{} {}", "✓".green().bold(), elapsed);
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        anyhow::bail!("command failed with exit code: {}", status);
    }
    Ok(())
}
