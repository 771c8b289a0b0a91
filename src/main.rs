//! Chart generation CLI.
//!
//! Runs chart pipelines for class/spec combinations and writes JSON chart
//! documents under the output directory.
//!
//! Usage:
//!   simbatch [OPTIONS] <pipeline>... <class:spec>...
//!
//! Examples:
//!   simbatch races shaman:elemental
//!   simbatch -e ./simc trinkets shaman:elemental paladin:retribution
//!   simbatch --remote https://example.org --apikey KEY races mage:fire

use std::env;
use std::path::PathBuf;
use std::process;

use log::{error, info};

use simbatch::character::load_profile;
use simbatch::config::{RemoteSettings, Settings};
use simbatch::pipeline::{create_pipeline, pipeline_keys, run_pipeline, Pipeline};
use simbatch::simulation::{Executor, LocalExecutor, RemoteExecutor};

struct CliRun {
    settings: Settings,
    pipelines: Vec<Box<dyn Pipeline>>,
    /// (class, spec) pairs.
    specs: Vec<(String, String)>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let run = match parse_args(&args) {
        Ok(run) => run,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!();
            print_help();
            process::exit(2);
        }
    };

    let executor: Box<dyn Executor> = if run.settings.remote.is_some() {
        match RemoteExecutor::new(&run.settings) {
            Ok(executor) => Box::new(executor),
            Err(err) => {
                error!("{}", err);
                process::exit(1);
            }
        }
    } else {
        Box::new(LocalExecutor::new(&run.settings))
    };

    let mut failures = 0u32;
    for pipeline in &run.pipelines {
        for (class, spec) in &run.specs {
            let profile_path = run
                .settings
                .profiles_dir
                .join(&run.settings.tier)
                .join(class)
                .join(format!("{}.json", spec));
            let profile = match load_profile(&profile_path) {
                Ok(profile) => profile,
                Err(err) => {
                    error!(
                        "could not load profile {}: {}",
                        profile_path.display(),
                        err
                    );
                    failures += 1;
                    continue;
                }
            };

            for fight_style in &run.settings.fight_styles {
                match run_pipeline(
                    pipeline.as_ref(),
                    class,
                    spec,
                    fight_style,
                    profile.clone(),
                    &run.settings,
                    executor.as_ref(),
                ) {
                    Ok(Some(path)) => info!("wrote {}", path.display()),
                    Ok(None) => {}
                    Err(err) => {
                        error!(
                            "pipeline '{}' failed for {}:{} ({}): {}",
                            pipeline.key(),
                            class,
                            spec,
                            fight_style,
                            err
                        );
                        failures += 1;
                    }
                }
            }
        }
    }

    if failures > 0 {
        error!("{} run(s) failed", failures);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<CliRun, String> {
    let mut settings = Settings::default();
    let mut pipelines: Vec<Box<dyn Pipeline>> = Vec::new();
    let mut specs: Vec<(String, String)> = Vec::new();
    let mut remote_url: Option<String> = None;
    let mut api_key: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-e" | "--executable" => {
                i += 1;
                let value = args.get(i).ok_or("--executable needs a path")?;
                settings.executable = PathBuf::from(value);
            }
            "-f" | "--fight-styles" => {
                i += 1;
                let value = args.get(i).ok_or("--fight-styles needs a list")?;
                settings.fight_styles = value.split(',').map(str::to_string).collect();
            }
            "--threads" => {
                i += 1;
                settings.threads = args.get(i).ok_or("--threads needs a count")?.clone();
            }
            "--tier" => {
                i += 1;
                settings.tier = args.get(i).ok_or("--tier needs a tier name")?.clone();
            }
            "-o" | "--output" => {
                i += 1;
                let value = args.get(i).ok_or("--output needs a directory")?;
                settings.output_dir = PathBuf::from(value);
            }
            "--profiles-dir" => {
                i += 1;
                let value = args.get(i).ok_or("--profiles-dir needs a directory")?;
                settings.profiles_dir = PathBuf::from(value);
            }
            "--remote" => {
                i += 1;
                remote_url = Some(args.get(i).ok_or("--remote needs a base URL")?.clone());
            }
            "--apikey" => {
                i += 1;
                api_key = Some(args.get(i).ok_or("--apikey needs a key")?.clone());
            }
            "--ptr" => {
                settings.ptr = true;
            }
            "--default-actions" => {
                settings.default_actions = true;
            }
            "--keep-files" => {
                settings.keep_files = true;
            }
            "--quick" => {
                let executable = settings.executable.clone();
                let fight_styles = settings.fight_styles.clone();
                settings = Settings::quick(executable);
                settings.fight_styles = fight_styles;
            }
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            token if token.starts_with('-') => {
                return Err(format!("unknown option: {}", token));
            }
            token => {
                if let Some(pipeline) = create_pipeline(token) {
                    pipelines.push(pipeline);
                } else if let Some((class, spec)) = token.split_once(':') {
                    specs.push((class.to_string(), spec.to_string()));
                } else {
                    return Err(format!(
                        "'{}' is neither a pipeline ({}) nor a class:spec pair",
                        token,
                        pipeline_keys().join(", ")
                    ));
                }
            }
        }
        i += 1;
    }

    if pipelines.is_empty() {
        return Err("no pipeline given".to_string());
    }
    if specs.is_empty() {
        return Err("no class:spec pair given".to_string());
    }

    if let Some(base_url) = remote_url {
        settings.remote = Some(RemoteSettings {
            base_url,
            api_key: api_key.unwrap_or_default(),
            threads: settings.threads.clone(),
        });
    } else if api_key.is_some() {
        return Err("--apikey requires --remote".to_string());
    }

    Ok(CliRun {
        settings,
        pipelines,
        specs,
    })
}

fn print_help() {
    println!("simbatch - SimulationCraft batch driver");
    println!();
    println!("USAGE:");
    println!("    simbatch [OPTIONS] <pipeline>... <class:spec>...");
    println!();
    println!("PIPELINES:");
    println!("    {}", pipeline_keys().join(", "));
    println!();
    println!("OPTIONS:");
    println!("    -e, --executable <PATH>    SimulationCraft binary (default: simc)");
    println!("    -f, --fight-styles <LIST>  Comma-separated fight styles (default: patchwerk)");
    println!("    --threads <N>              Simulator thread count (default: 8)");
    println!("    --tier <TIER>              Profile tier directory (default: T27)");
    println!("    -o, --output <DIR>         Report output directory (default: results)");
    println!("    --profiles-dir <DIR>       Baseline profile directory (default: profiles)");
    println!("    --remote <URL>             Run through the remote job queue at URL");
    println!("    --apikey <KEY>             API key for the remote job queue");
    println!("    --ptr                      Simulate against PTR game data");
    println!("    --default-actions          Use the simulator's default action lists");
    println!("    --keep-files               Keep request/result artifacts");
    println!("    --quick                    Fast low-accuracy settings for smoke tests");
    println!("    -h, --help                 Show this help");
    println!();
    println!("EXAMPLES:");
    println!("    simbatch races shaman:elemental");
    println!("    simbatch -e ./simc trinkets shaman:elemental paladin:retribution");
    println!("    simbatch -f patchwerk,hecticaddcleave races trinkets druid:balance");
}
