use crate::types::{ActuatorState, StableClass};
use tracing::info;

/// Estado visible al final de cada tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayStatus {
    pub stable: StableClass,
    pub actuator: ActuatorState,
}

/// Consumidor del estado para presentación (sin retorno hacia el núcleo)
pub trait StatusSink {
    fn show(&mut self, status: DisplayStatus);
}

/// Registra el estado solo cuando cambia
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<DisplayStatus>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSink for LogSink {
    fn show(&mut self, status: DisplayStatus) {
        if self.last == Some(status) {
            return;
        }
        info!(
            "Dedos: {} | robot: {}",
            status.stable,
            status.actuator.label()
        );
        self.last = Some(status);
    }
}

/// Descarta el estado
#[derive(Debug, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn show(&mut self, _status: DisplayStatus) {}
}

/// Guarda cada estado recibido (repeticiones, pruebas)
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub history: Vec<DisplayStatus>,
}

impl StatusSink for RecordingSink {
    fn show(&mut self, status: DisplayStatus) {
        self.history.push(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_tracks_last_status() {
        let mut sink = LogSink::new();
        let status = DisplayStatus {
            stable: 2,
            actuator: ActuatorState::Busy,
        };
        sink.show(status);
        sink.show(status);
        assert_eq!(sink.last, Some(status));
    }

    #[test]
    fn test_recording_sink_keeps_every_tick() {
        let mut sink = RecordingSink::default();
        for stable in 0..3 {
            sink.show(DisplayStatus {
                stable,
                actuator: ActuatorState::Idle,
            });
        }
        assert_eq!(sink.history.len(), 3);
        assert_eq!(sink.history[2].stable, 2);
    }
}
