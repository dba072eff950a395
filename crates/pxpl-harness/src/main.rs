use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pxpl_harness::{
    telemetry, ArtifactCleaner, ArtifactManifest, BuildDriver, BuildProfile, BuildReport, Corpus,
    DemoImage, HarnessConfig, TestCycle,
};

fn cli() -> Command {
    Command::new("pxpl-harness")
        .version(pxpl_harness::VERSION)
        .about("Round-trip verification harness for the pxpl steganography tool")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("project-root")
                .long("project-root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Root of the pxpl source tree"),
        )
        .arg(
            Arg::new("work-dir")
                .long("work-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory for fixtures and tool outputs"),
        )
        .arg(
            Arg::new("tool")
                .long("tool")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the pxpl executable"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_parser(value_parser!(u64).range(1..))
                .help("Per-invocation timeout in seconds"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("test")
                .about("Build if needed, generate fixtures, run all scenarios, clean up")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                )
                .arg(
                    Arg::new("no-build")
                        .long("no-build")
                        .action(ArgAction::SetTrue)
                        .help("Fail instead of building a missing tool"),
                ),
        )
        .subcommand(Command::new("build").about("Build the CLI and GUI executables"))
        .subcommand(Command::new("compile").about("Build the CLI executable only"))
        .subcommand(Command::new("cleanup").about("Remove test artifacts only"))
        .subcommand(Command::new("demo").about("Create the demo cover image"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<HarnessConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::new(),
    };
    if let Some(root) = matches.get_one::<PathBuf>("project-root") {
        config = config.with_project_root(root);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("work-dir") {
        config = config.with_work_dir(dir);
    }
    if let Some(tool) = matches.get_one::<PathBuf>("tool") {
        config = config.with_tool_path(tool);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout_secs(*secs);
    }
    config.validate()?;
    Ok(config)
}

fn print_build(report: &BuildReport) {
    for exe in &report.executables {
        println!("Executable found: {}", exe.display());
    }
    println!("Build completed successfully");
}

async fn run(matches: ArgMatches) -> anyhow::Result<ExitCode> {
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("test", args)) => {
            let auto_build = config.auto_build && !args.get_flag("no-build");
            let config = config.with_auto_build(auto_build);
            let report = TestCycle::new(config)
                .run()
                .await
                .context("test cycle aborted")?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render_text());
            }
            Ok(if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("build", _)) => {
            let report = BuildDriver::new(config)
                .build(BuildProfile::Both)
                .await
                .context("build failed")?;
            print_build(&report);
            Ok(ExitCode::SUCCESS)
        }
        Some(("compile", _)) => {
            let report = BuildDriver::new(config)
                .build(BuildProfile::CliOnly)
                .await
                .context("compile failed")?;
            print_build(&report);
            Ok(ExitCode::SUCCESS)
        }
        Some(("cleanup", _)) => {
            let cleaner =
                ArtifactCleaner::new(&config.work_dir, Corpus::standard().artifact_names());
            let removed = cleaner.cleanup(&ArtifactManifest::new());
            if removed > 0 {
                println!("Cleanup complete: {removed} files removed");
            } else {
                println!("No files to clean up");
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("demo", _)) => {
            let path = config.demo_path();
            DemoImage::write(&path).context("could not create demo image")?;
            println!("Created {} (200x200 RGB)", path.display());
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            cli().print_help()?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    telemetry::init(matches.get_count("verbose"), matches.get_flag("log-json"));

    match run(matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
