use crate::config::Args;
use crate::error::SimError;
use crate::listener::Listeners;
use crate::schedule::Schedule;
use crate::service::{ImportReport, RegistrationService};
use crate::simulation::{AirportView, FlightView, RunStatus, Scene, Simulation};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, mpsc};
use std::thread;
use tabled::settings::{Alignment, Style};
use tracing::Level;

mod airport;
mod clock;
mod config;
mod departure;
mod error;
mod flight;
mod listener;
mod position;
mod schedule;
mod service;
mod simulation;
mod time;

const COMMANDS: [&str; 15] = [
    "airport", "flight", "start", "pause", "stop", "status", "ls", "hide", "show", "watch", "load",
    "save", "help", "exit", "quit",
];

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, candidates))
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn paginate(content: String) {
    let spawned = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());
    let Ok(mut pager) = spawned else {
        println!("{content}");
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // quitting the pager early closes the pipe
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {e}");
            }
        }
    }
    let _ = pager.wait();
}

fn print_table<T: tabled::Tabled>(rows: &[T], empty: &str) {
    if rows.is_empty() {
        println!("{empty}");
        return;
    }
    let mut table = tabled::Table::new(rows);
    table.with(Style::rounded());
    table.with(Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{table}");
    }
}

fn report_error(e: &SimError) {
    if e.is_validation() {
        println!("{} {e}", "Rejected:".yellow().bold());
    } else {
        println!("{} {e}", "Error:".red().bold());
    }
}

fn report_import(report: &ImportReport) {
    println!(
        "Loaded {} airports and {} flights.",
        report.airports.to_string().as_str().green(),
        report.flights.to_string().as_str().green()
    );
    for e in &report.errors {
        println!("  {} {e}", "skipped".yellow());
    }
}

fn print_status(sim: &Simulation) {
    let status = match sim.status() {
        RunStatus::Idle => "idle".normal(),
        RunStatus::Running => "running".green(),
        RunStatus::Paused => "paused".yellow(),
        RunStatus::Failed(reason) => format!("failed ({reason})").as_str().red(),
    };
    println!(
        "Simulation {status} at {} | {} airports, {} flights scheduled, {} in the air",
        sim.minutes(),
        sim.schedule().airports().len(),
        sim.schedule().flights().len(),
        sim.active_flights().len()
    );
}

enum WatchEvent {
    Changed,
    Done,
}

fn draw_scene(scene: &Scene) {
    let visible: Vec<FlightView> = scene.flights.iter().filter(|f| f.visible).cloned().collect();
    print!("\x1B[2J\x1B[H");
    println!("{} {}  (press Enter to return)", "Virtual time".bold(), scene.minutes);
    let mut table = tabled::Table::new(&visible);
    table.with(Style::rounded());
    println!("{table}");
}

/// Redraws the airborne flights on every change until the user presses Enter.
fn watch(sim: &Simulation) {
    let (tx, rx) = mpsc::channel();
    let changes = tx.clone();
    let id = sim.listeners().subscribe(move || {
        let _ = changes.send(WatchEvent::Changed);
    });
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(WatchEvent::Done);
    });

    draw_scene(&sim.scene());
    while let Ok(event) = rx.recv() {
        match event {
            WatchEvent::Changed => {
                // coalesce a burst of notifications into one frame
                let mut done = false;
                while let Ok(next) = rx.try_recv() {
                    done |= matches!(next, WatchEvent::Done);
                }
                if done {
                    break;
                }
                draw_scene(&sim.scene());
            }
            WatchEvent::Done => break,
        }
    }
    sim.listeners().unsubscribe(id);
}

fn print_help() {
    println!("\nAvailable Commands:");
    println!("  airport <CODE> <x> <y> [name]        - Register an airport at (x, y), both within -90..90");
    println!("  flight <FROM> <TO> <HH:MM> <minutes> - Schedule a daily flight");
    println!("  start / pause / stop                 - Run, pause (toggle) or stop and rewind the simulation");
    println!("  status                               - Show run state and virtual time");
    println!("  ls [airports|flights|active]         - List airports, scheduled flights or flights in the air");
    println!("  hide <CODE> / show <CODE>            - Hide or show an airport and the flights touching it");
    println!("  watch                                - Follow flights in the air until Enter is pressed");
    println!("  load <file> / save <file>            - Import or export a JSON scenario");
    println!("  help / ?                             - Show this help menu");
    println!("  exit / quit                          - Stop the simulation and exit\n");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let listeners = Arc::new(Listeners::new());
    let schedule = Arc::new(Schedule::new(Arc::clone(&listeners)));
    let service = RegistrationService::new(Arc::clone(&schedule));
    let sim = Simulation::new(schedule, listeners, args.clock_config()?);

    if let Some(path) = &args.scenario {
        let report = service.load_file(path)?;
        report_import(&report);
    }
    println!("Tower online. Type {} for the list of commands.", "help".bold());

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    let helper = CompleteHelper {
        commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
    };
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        rl.add_history_entry(trimmed)?;

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts[0] {
            "airport" => {
                if let (Some(code), Some(x), Some(y)) = (parts.get(1), parts.get(2), parts.get(3)) {
                    let name = parts.get(4..).map(|rest| rest.join(" ")).unwrap_or_default();
                    match service.register_airport(code, x, y, &name) {
                        Ok(airport) => println!("Registered {}", airport.to_string().as_str().green()),
                        Err(e) => report_error(&e),
                    }
                } else {
                    println!("Usage: airport <CODE> <x> <y> [name]");
                }
            }
            "flight" => {
                if let [_, from, to, takeoff, duration] = parts[..] {
                    match service.register_flight(from, to, takeoff, duration) {
                        Ok(flight) => println!("Scheduled {} {}", flight.id, flight.to_string().as_str().green()),
                        Err(e) => report_error(&e),
                    }
                } else {
                    println!("Usage: flight <FROM> <TO> <HH:MM> <minutes>");
                }
            }
            "start" => match sim.start() {
                Ok(()) => print_status(&sim),
                Err(e) => report_error(&e),
            },
            "pause" => {
                if !sim.is_running() {
                    println!("Simulation is not running.");
                } else {
                    sim.pause_toggle();
                    let state = if sim.is_paused() { "Paused" } else { "Resumed" };
                    println!("{state} at {}", sim.minutes());
                }
            }
            "stop" => {
                sim.stop();
                println!("Simulation stopped; schedule rewound.");
            }
            "status" => print_status(&sim),
            "ls" => match parts.get(1).copied().unwrap_or("flights") {
                "a" | "airports" => {
                    let airports: Vec<AirportView> = sim.airports();
                    print_table(&airports, "No airports registered.");
                }
                "active" => print_table(&sim.active_flights(), "No flights in the air."),
                _ => {
                    let flights = sim.schedule().flights();
                    let rows = flights.iter().map(|f| f.as_ref()).collect::<Vec<_>>();
                    print_table(&rows, "No flights scheduled.");
                }
            },
            cmd @ ("hide" | "show") => {
                if let Some(code) = parts.get(1) {
                    match sim.set_airport_visible(code, cmd == "show") {
                        Ok(()) => {
                            let state = if cmd == "show" { "visible" } else { "hidden" };
                            println!("Airport {} is now {state}", code.to_uppercase());
                        }
                        Err(e) => report_error(&e),
                    }
                } else {
                    println!("Usage: {cmd} <CODE>");
                }
            }
            "watch" => watch(&sim),
            "load" => match parts.get(1) {
                Some(path) => match service.load_file(path) {
                    Ok(report) => report_import(&report),
                    Err(e) => report_error(&e),
                },
                None => println!("Usage: load <file>"),
            },
            "save" => match parts.get(1) {
                Some(path) => match service.save_file(path) {
                    Ok(()) => println!("Scenario saved to {path}"),
                    Err(e) => report_error(&e),
                },
                None => println!("Usage: save <file>"),
            },
            "help" | "?" => print_help(),
            "exit" | "quit" => break,
            other => println!("Unknown command: {other}"),
        }
    }

    sim.stop();
    Ok(())
}
