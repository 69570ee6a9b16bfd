use anyhow::{Result, anyhow};
use log::info;
use pico_args::Arguments;
use std::{
    env,
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use gesturectl::config::Profile;
use gesturectl::port::StdDelay;
use gesturectl::replay::{ReplayDevice, Trace};
use gesturectl::session::GestureSensor;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // options first; pico-args hands out free args in order
    let profile_path: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
    let timeout_ms: Option<u64> = pargs.opt_value_from_str("--timeout-ms")?;
    let json = pargs.contains("--json");
    let enable = pargs.contains("--enable");

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("replay") => {
            let trace_path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturectl replay <trace.json>"))?;

            let mut profile = Profile::load_or_install_default(profile_path.as_deref())?;
            if let Some(ms) = timeout_ms {
                if ms == 0 {
                    return Err(anyhow!("--timeout-ms must be positive"));
                }
                profile.session.timeout_ms = ms;
            }
            let trace = Trace::load(&trace_path)?;

            let cancel = Arc::new(AtomicBool::new(false));
            signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&cancel))?;

            let mut sensor = GestureSensor::new(ReplayDevice::new(trace), StdDelay, &profile);
            sensor.init()?;
            if enable {
                sensor.enable_gesture_engine()?;
            }

            let direction = sensor
                .read_gesture(Some(&cancel))
                .map_err(|e| anyhow!("gesture session failed: {e}"))?;

            if enable {
                sensor.disable_gesture_engine()?;
            }
            info!(
                "replay of {} done ({} register writes)",
                trace_path.display(),
                sensor.port().writes().len()
            );

            if json {
                print_response(&serde_json::json!({
                    "ok": true,
                    "data": {
                        "direction": direction,
                        "trace": trace_path,
                        "writes": sensor.port().writes().len(),
                    }
                }));
            } else {
                println!("{}", direction.as_str());
            }
            Ok(())
        }

        Some("config") => {
            let profile = Profile::load_or_install_default(profile_path.as_deref())?;
            print!("{}", profile.to_toml_string()?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"gesturectl — gesture engine for APDS-9960 class sensors

USAGE:
  gesturectl help [command]            Show general or command-specific help
  gesturectl replay <trace.json>       Run one gesture session against a recorded trace
  gesturectl config                    Print the effective profile

OPTIONS:
  --profile <path>                     Use this profile instead of the user profile
  --timeout-ms <ms>                    Override session.timeout_ms
  --enable                             Power the gesture engine before replaying
  --json                               Machine-readable output

TIPS:
  - User profile: ~/.config/gesturectl/profile.toml
  - RUST_LOG=debug shows per-batch classifier state
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "replay" => println!(
            "usage: gesturectl replay <trace.json> [--profile PATH] [--timeout-ms N] [--enable] [--json]\n\
             Serves the trace's FIFO batches to the gesture engine and prints the decoded direction."
        ),
        "config" => println!(
            "usage: gesturectl config [--profile PATH]\nPrints the profile after defaults are applied."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
