//! Interactive console: `ocl_*` commands typed on stdin drive the same input
//! device as the HTTP gateway.
//!
//! Lines are parsed on the console thread; each command is then applied on the
//! simulation thread through the dispatcher and its reply printed back.

use crate::core::input::Control;
use crate::core::{DispatchHandle, Simulation};
use log::{debug, warn};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Wait bound for console round trips (longer than HTTP, a person is typing)
const CONSOLE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Move { horizontal: f32, vertical: f32 },
    Look { horizontal: f32, vertical: f32 },
    /// Click jump, optional auto-release override in seconds
    Jump { duration: Option<f32> },
    Crouch(bool),
    Sprint(bool),
    Fire(bool),
    Aim(bool),
    Reload,
    Reset,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsoleParseError {
    #[error("Unknown command: {0} (type 'ocl_help' for a list)")]
    Unknown(String),
    #[error("Missing argument for {command}, usage: {usage}")]
    MissingArgument { command: &'static str, usage: String },
    #[error("Invalid argument '{value}' for {command}, usage: {usage}")]
    InvalidArgument { command: &'static str, value: String, usage: String },
}

struct CommandSpec {
    name: &'static str,
    args: &'static str,
    help: &'static str,
}

// Help output order is table order
const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "ocl_move", args: "<h> <v>", help: "Set move stick" },
    CommandSpec { name: "ocl_look", args: "<h> <v>", help: "Set look stick" },
    CommandSpec { name: "ocl_jump", args: "[duration]", help: "Jump (click, auto-release)" },
    CommandSpec { name: "ocl_crouch", args: "[true|false]", help: "Crouch (press/release)" },
    CommandSpec { name: "ocl_sprint", args: "[true|false]", help: "Sprint (press/release)" },
    CommandSpec { name: "ocl_fire", args: "[true|false]", help: "Fire (press/release)" },
    CommandSpec { name: "ocl_aim", args: "[true|false]", help: "Aim (press/release)" },
    CommandSpec { name: "ocl_reload", args: "", help: "Reload (click)" },
    CommandSpec { name: "ocl_reset", args: "", help: "Release every control and zero both sticks" },
    CommandSpec { name: "ocl_status", args: "", help: "Show device and player state" },
    CommandSpec { name: "ocl_help", args: "", help: "Show this help" },
    CommandSpec { name: "quit", args: "", help: "Stop the simulation and exit" },
];

fn spec(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|s| s.name == name)
}

fn usage(spec: &CommandSpec) -> String {
    if spec.args.is_empty() {
        spec.name.to_string()
    } else {
        format!("{} {}", spec.name, spec.args)
    }
}

pub fn help_text() -> String {
    let mut out = String::from("Available commands:\n");
    for spec in COMMANDS {
        out.push_str(&format!("  {:<28} - {}\n", usage(spec), spec.help));
    }
    out
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, ConsoleParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();
    let Some(spec) = spec(&name) else {
        return Err(ConsoleParseError::Unknown(name));
    };

    let float = |index: usize| -> Result<f32, ConsoleParseError> {
        let raw = args.get(index).ok_or_else(|| ConsoleParseError::MissingArgument {
            command: spec.name,
            usage: usage(spec),
        })?;
        raw.parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ConsoleParseError::InvalidArgument {
                command: spec.name,
                value: raw.to_string(),
                usage: usage(spec),
            })
    };
    // Flags default to true when omitted
    let flag = || -> Result<bool, ConsoleParseError> {
        match args.first() {
            None => Ok(true),
            Some(raw) => parse_bool(raw).ok_or_else(|| ConsoleParseError::InvalidArgument {
                command: spec.name,
                value: raw.to_string(),
                usage: usage(spec),
            }),
        }
    };

    let command = match spec.name {
        "ocl_move" => ConsoleCommand::Move { horizontal: float(0)?, vertical: float(1)? },
        "ocl_look" => ConsoleCommand::Look { horizontal: float(0)?, vertical: float(1)? },
        "ocl_jump" => {
            let duration = if args.is_empty() { None } else { Some(float(0)?.max(0.0)) };
            ConsoleCommand::Jump { duration }
        }
        "ocl_crouch" => ConsoleCommand::Crouch(flag()?),
        "ocl_sprint" => ConsoleCommand::Sprint(flag()?),
        "ocl_fire" => ConsoleCommand::Fire(flag()?),
        "ocl_aim" => ConsoleCommand::Aim(flag()?),
        "ocl_reload" => ConsoleCommand::Reload,
        "ocl_reset" => ConsoleCommand::Reset,
        "ocl_status" => ConsoleCommand::Status,
        "ocl_help" => ConsoleCommand::Help,
        _ => ConsoleCommand::Quit,
    };
    Ok(Some(command))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl ConsoleCommand {
    /// Apply to the simulation and describe the result
    pub fn apply(&self, sim: &mut Simulation) -> String {
        match *self {
            ConsoleCommand::Move { horizontal, vertical } => {
                sim.input.move_stick(horizontal, vertical);
                format!("Move: h={:.2}, v={:.2}", horizontal, vertical)
            }
            ConsoleCommand::Look { horizontal, vertical } => {
                sim.input.look_stick(horizontal, vertical);
                format!("Look: h={:.2}, v={:.2}", horizontal, vertical)
            }
            ConsoleCommand::Jump { duration } => {
                let duration = duration.unwrap_or(sim.input.click_duration());
                sim.input.click(Control::Jump, duration);
                format!("Jump: auto-release after {:.2}s", duration)
            }
            ConsoleCommand::Crouch(on) => {
                sim.input.crouch(on);
                format!("Crouch: {}", on)
            }
            ConsoleCommand::Sprint(on) => {
                sim.input.sprint(on);
                format!("Sprint: {}", on)
            }
            ConsoleCommand::Fire(on) => {
                sim.input.fire(on);
                format!("Fire: {}", on)
            }
            ConsoleCommand::Aim(on) => {
                sim.input.aim(on);
                format!("Aim: {}", on)
            }
            ConsoleCommand::Reload => {
                sim.input.reload();
                "Reload".to_string()
            }
            ConsoleCommand::Reset => {
                sim.input.reset_all();
                "All input reset".to_string()
            }
            ConsoleCommand::Status => status_text(sim),
            ConsoleCommand::Help => help_text(),
            ConsoleCommand::Quit => "Quitting".to_string(),
        }
    }
}

fn status_text(sim: &Simulation) -> String {
    let snapshot = sim.input.snapshot();
    let active: Vec<&str> = snapshot
        .controls
        .iter()
        .filter(|c| c.active)
        .map(|c| c.control.as_str())
        .collect();

    let mut out = format!("=== Status (tick {}, t={:.2}s) ===\n", sim.ticks(), sim.clock());
    out.push_str(&format!(
        "Move stick: ({:.2}, {:.2})  Look stick: ({:.2}, {:.2})\n",
        snapshot.move_axis[0], snapshot.move_axis[1], snapshot.look_axis[0], snapshot.look_axis[1]
    ));
    if active.is_empty() {
        out.push_str("Active controls: none\n");
    } else {
        out.push_str(&format!("Active controls: {}\n", active.join(", ")));
    }
    match sim.player() {
        Some(p) => out.push_str(&format!(
            "Player: pos=({:.2}, {:.2}, {:.2}) grounded={} crouching={}\n",
            p.position.x, p.position.y, p.position.z, p.status.grounded, p.status.crouching
        )),
        None => out.push_str("Player: not found\n"),
    }
    out
}

/// Read commands from `reader` until EOF, `quit`, or `quit_flag` is raised.
///
/// Replies and parse errors go to `out`. `quit` raises `quit_flag`.
pub fn run_console<R: BufRead, W: Write>(
    reader: R,
    mut out: W,
    sim: &DispatchHandle<Simulation>,
    quit_flag: &AtomicBool,
) {
    for line in reader.lines() {
        if quit_flag.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        };
        let reply = match parse(&line) {
            Ok(None) => continue,
            Ok(Some(ConsoleCommand::Quit)) => {
                quit_flag.store(true, Ordering::SeqCst);
                let _ = writeln!(out, "Quitting");
                break;
            }
            Ok(Some(ConsoleCommand::Help)) => help_text(),
            Ok(Some(command)) => {
                debug!("Console command: {:?}", command);
                match sim.execute_and_wait(move |s| command.apply(s), CONSOLE_TIMEOUT) {
                    Ok(reply) => reply,
                    Err(e) => format!("Command not confirmed: {}", e),
                }
            }
            Err(e) => e.to_string(),
        };
        let _ = writeln!(out, "{}", reply.trim_end());
        let _ = out.flush();
    }
}

/// Spawn the stdin console thread
pub fn spawn_stdin_console(
    sim: DispatchHandle<Simulation>,
    quit_flag: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("console".into()).spawn(move || {
        let stdin = std::io::stdin();
        run_console(stdin.lock(), std::io::stdout(), &sim, &quit_flag);
        debug!("Console thread exiting");
    })
}
