use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use quirobot::csv_loader::load_counts_from_csv;
use quirobot::debounce::DebounceController;
use quirobot::orchestrator::TickLoop;
use quirobot::sink::NullSink;
use quirobot::stabilizer::Stabilizer;
use quirobot::transport::SimulatedActuator;
use quirobot::types::DEFAULT_HISTORY_SIZE;

const USAGE: &str = "Uso: replay_counts [--ack-after N] [--history-size N] <archivo.csv>";

struct ReplayOptions {
    ack_after: usize,
    history_size: usize,
}

fn parse_number(flag: &str, value: Option<String>) -> Result<usize> {
    let value = value.ok_or_else(|| anyhow!("{} requiere un valor\n{}", flag, USAGE))?;
    value
        .parse()
        .with_context(|| format!("Valor inválido para {}: {}", flag, value))
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut ack_after = 10;
    let mut history_size = DEFAULT_HISTORY_SIZE;
    let mut csv_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ack-after" => ack_after = parse_number("--ack-after", args.next())?,
            "--history-size" => history_size = parse_number("--history-size", args.next())?,
            _ => {
                if csv_path.is_some() {
                    bail!(USAGE);
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    if history_size == 0 {
        bail!("--history-size debe ser mayor que 0");
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV\n{}", USAGE))?;
    Ok((
        csv_path,
        ReplayOptions {
            ack_after,
            history_size,
        },
    ))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo conteos desde {:?}", csv_path);

    let counts = load_counts_from_csv(&csv_path)?;

    let mut tick_loop = TickLoop::new(
        Stabilizer::new(opts.history_size),
        DebounceController::default(),
        Some(SimulatedActuator::new(opts.ack_after)),
        NullSink,
    );

    println!(
        "🪟 Ventana de {} frames, ack tras {} ticks",
        tick_loop.stabilizer().capacity(),
        opts.ack_after
    );

    println!(
        "\n{:>5}  {:>4}  {:>6}  {:<6}  {:<4}  {}",
        "tick", "raw", "stable", "parity", "cmd", "robot"
    );
    for (tick, raw) in counts.into_iter().enumerate() {
        let outcome = tick_loop.tick(raw);
        let cmd = outcome
            .command
            .map(|c| (c.byte() as char).to_string())
            .unwrap_or_else(|| "-".to_string());
        let ack = if outcome.lines.is_empty() {
            String::new()
        } else {
            format!("  << {}", outcome.lines.join(" | "))
        };
        println!(
            "{:>5}  {:>4}  {:>6}  {:<6}  {:<4}  {}{}",
            tick,
            outcome.raw,
            outcome.stable,
            format!("{:?}", outcome.parity),
            cmd,
            outcome.actuator,
            ack
        );
    }

    let stats = tick_loop.stats();
    println!(
        "\n📊 ticks={} comandos={} completados={}",
        stats.ticks, stats.commands, stats.completions
    );

    if let Some(actuator) = tick_loop.link() {
        let sent: Vec<String> = actuator
            .sent()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        println!("🤖 Secuencia enviada: [{}]", sent.join(", "));
    }

    Ok(())
}
