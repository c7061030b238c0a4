use crate::command::{map_parity, Command, Parity};
use crate::debounce::DebounceController;
use crate::sink::{DisplayStatus, StatusSink};
use crate::stabilizer::Stabilizer;
use crate::transport::CommandLink;
use crate::types::{ActuatorState, RawClass, StableClass};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Señal de parada compartida entre hilos
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crea la señal y la activa con Ctrl+C
    pub fn install_ctrlc() -> Result<Self, ctrlc::Error> {
        let signal = Self::new();
        let handler_signal = signal.clone();
        ctrlc::set_handler(move || handler_signal.request_stop())?;
        Ok(signal)
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StopRequested,
    SourceExhausted,
}

/// Resultado de un tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub raw: RawClass,
    pub stable: StableClass,
    pub parity: Parity,
    pub command: Option<Command>,
    pub actuator: ActuatorState,
    pub lines: Vec<String>,
    pub write_failed: bool,
}

/// Estadísticas acumuladas del bucle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub commands: u64,
    pub completions: u64,
    pub write_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: RunStats,
    pub reason: StopReason,
}

/// Bucle de ticks: estabilizar → mapear → acks → decidir → escribir
///
/// Sin enlace (`None`) el núcleo sigue funcionando y los comandos se
/// descartan. El estado pasa a BUSY antes de intentar la escritura y un
/// fallo de escritura no lo revierte.
pub struct TickLoop<L: CommandLink, S: StatusSink> {
    stabilizer: Stabilizer,
    controller: DebounceController,
    link: Option<L>,
    sink: S,
    stats: RunStats,
}

impl<L: CommandLink, S: StatusSink> TickLoop<L, S> {
    pub fn new(
        stabilizer: Stabilizer,
        controller: DebounceController,
        link: Option<L>,
        sink: S,
    ) -> Self {
        Self {
            stabilizer,
            controller,
            link,
            sink,
            stats: RunStats::default(),
        }
    }

    /// Ejecuta un tick completo con una nueva clasificación cruda
    pub fn tick(&mut self, raw: RawClass) -> TickOutcome {
        let stable = self.stabilizer.observe(raw);
        let parity = map_parity(stable);

        let lines = match self.link.as_mut() {
            Some(link) => link.drain_lines(),
            None => Vec::new(),
        };
        for line in &lines {
            info!("<< actuador: {}", line);
            if self.controller.is_completion(line) {
                self.stats.completions += 1;
            }
        }

        let command = self.controller.update(parity, &lines);

        let mut write_failed = false;
        if let Some(command) = command {
            self.stats.commands += 1;
            write_failed = !self.dispatch(command);
        }

        let actuator = self.controller.state();
        self.sink.show(DisplayStatus { stable, actuator });
        self.stats.ticks += 1;

        TickOutcome {
            raw,
            stable,
            parity,
            command,
            actuator,
            lines,
            write_failed,
        }
    }

    /// Envío best-effort; devuelve false solo si la escritura falló
    fn dispatch(&mut self, command: Command) -> bool {
        let Some(link) = self.link.as_mut() else {
            debug!("Comando {} descartado: sin enlace serie", command.label());
            return true;
        };

        match link.send(command) {
            Ok(()) => {
                info!(">> Enviado {} ({})", command.label(), command.byte() as char);
                true
            }
            Err(e) => {
                warn!("❌ Error enviando {}: {}", command.label(), e);
                self.stats.write_failures += 1;
                false
            }
        }
    }

    /// Consume clasificaciones hasta la señal de parada o el fin de la fuente
    pub fn run(
        &mut self,
        frames: &Receiver<RawClass>,
        stop: &StopSignal,
        poll_interval: Duration,
    ) -> RunSummary {
        let reason = loop {
            if stop.is_stopped() {
                break StopReason::StopRequested;
            }
            match frames.recv_timeout(poll_interval) {
                Ok(raw) => {
                    self.tick(raw);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break StopReason::SourceExhausted,
            }
        };

        RunSummary {
            stats: self.stats.clone(),
            reason,
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn actuator_state(&self) -> ActuatorState {
        self.controller.state()
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    pub fn link_mut(&mut self) -> Option<&mut L> {
        self.link.as_mut()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Devuelve el enlace para liberarlo explícitamente
    pub fn into_link(self) -> Option<L> {
        self.link
    }
}
