/*
Conteo de dedos → comandos seriales para un robot

Sistema que:
1. Recibe una clasificación por frame (conteo de dedos o landmarks de la mano)
2. Estabiliza el conteo con voto mayoritario sobre una ventana deslizante
3. Envía '1' (impar) o '0' (par) al actuador una vez por gesto
4. Espera la línea "Task completed" antes de volver a enviar

La captura de video y la detección de landmarks quedan fuera: otro proceso
escribe un frame por línea en stdin o en un archivo.

Ejemplos:
    vision_pipeline | ./target/release/quirobot --port AUTO
    ./target/release/quirobot --port /dev/ttyACM0 --input grabacion.csv
    RUST_LOG=debug ./target/release/quirobot --no-serial --input frames.txt
*/

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quirobot::config::Config;
use quirobot::csv_loader::load_counts_from_csv;
use quirobot::debounce::DebounceController;
use quirobot::orchestrator::{StopReason, StopSignal, TickLoop};
use quirobot::sink::LogSink;
use quirobot::source::{spawn_line_source, spawn_replay_source};
use quirobot::stabilizer::Stabilizer;
use quirobot::transport::{resolve_port, SerialLink};
use quirobot::types::RawClass;

/// Frames en vuelo entre la fuente y el bucle de ticks
const FRAME_QUEUE_SIZE: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "quirobot")]
#[command(about = "Conteo de dedos estabilizado → comandos seriales con handshake")]
struct Cli {
    /// Archivo JSON de configuración
    #[arg(long)]
    config: Option<PathBuf>,

    /// Puerto serie (AUTO para detectar)
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    #[arg(long = "history-size")]
    history_size: Option<usize>,

    /// Marcador de finalización enviado por el actuador
    #[arg(long)]
    marker: Option<String>,

    /// Fuente de frames: "-" para stdin, un .csv (tick,count) o un archivo de líneas
    #[arg(long, default_value = "-")]
    input: String,

    /// Ignora el puerto serie aunque esté configurado
    #[arg(long = "no-serial")]
    no_serial: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(size) = cli.history_size {
        config.history_size = size;
    }
    if let Some(marker) = &cli.marker {
        config.completion_marker = marker.clone();
    }
    if cli.no_serial {
        config.port = None;
    }

    config.validate()?;
    Ok(config)
}

/// Abre el enlace; cualquier fallo deja el sistema en modo solo-visualización
fn open_link(config: &Config) -> Option<SerialLink> {
    let configured = config.port.as_deref()?;

    let port = match resolve_port(configured) {
        Ok(port) => port,
        Err(e) => {
            warn!("⚠️  {} - continuando sin actuador", e);
            return None;
        }
    };

    match SerialLink::open(&config.serial_settings(&port)) {
        Ok(link) => {
            info!("✅ Puerto serie abierto: {} @ {}", port, config.baud_rate);
            Some(link)
        }
        Err(e) => {
            warn!("⚠️  {} - continuando sin actuador", e);
            None
        }
    }
}

fn spawn_source(input: &str, config: &Config, tx: crossbeam_channel::Sender<RawClass>) -> Result<()> {
    if input == "-" {
        info!("📥 Leyendo frames desde stdin");
        spawn_line_source(BufReader::new(io::stdin()), tx);
        return Ok(());
    }

    let path = Path::new(input);
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let counts = load_counts_from_csv(path)?;
        info!("🎞️  Reproduciendo {} frames desde {:?}", counts.len(), path);
        spawn_replay_source(counts, tx, config.replay_interval());
    } else {
        let file = File::open(path).with_context(|| format!("No se pudo abrir {:?}", path))?;
        info!("📥 Leyendo frames desde {:?}", path);
        spawn_line_source(BufReader::new(file), tx);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!("🎯 quirobot - conteo de dedos → actuador serie");

    let stop = StopSignal::install_ctrlc().context("No se pudo instalar el manejador de Ctrl+C")?;

    let link = open_link(&config);
    if link.is_none() {
        info!("🔧 Modo: solo visualización (sin actuador)");
    }

    let (tx, rx) = bounded::<RawClass>(FRAME_QUEUE_SIZE);
    spawn_source(&cli.input, &config, tx)?;

    let controller = DebounceController::new(config.completion_marker.clone());
    info!("⏳ Marcador de finalización: {:?}", controller.marker());

    let mut tick_loop = TickLoop::new(
        Stabilizer::new(config.history_size),
        controller,
        link,
        LogSink::new(),
    );

    info!("🎬 Iniciando bucle de ticks (Ctrl+C para salir)...");
    let summary = tick_loop.run(&rx, &stop, config.poll_interval());

    match summary.reason {
        StopReason::StopRequested => info!("👋 Saliendo..."),
        StopReason::SourceExhausted => info!("📭 Fuente de frames agotada"),
    }
    info!(
        "📊 ticks={} comandos={} completados={} fallos_escritura={}",
        summary.stats.ticks,
        summary.stats.commands,
        summary.stats.completions,
        summary.stats.write_failures
    );

    // Cerrar el puerto y detener el hilo lector
    drop(tick_loop.into_link());
    Ok(())
}
