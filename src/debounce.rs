use crate::command::{Command, Parity};
use crate::types::{ActuatorState, COMPLETION_MARKER};

/// Controlador anti-rebote con handshake BUSY/IDLE
///
/// Emite como mucho un comando por episodio de gesto. Tras emitir queda en
/// BUSY hasta que llega una línea con el marcador de finalización; no hay
/// timeout, si el marcador nunca llega el controlador no vuelve a emitir.
pub struct DebounceController {
    marker: String,
    state: ActuatorState,
    /// Paridad del último comando emitido; `None` tras soltar el gesto
    last_issued: Option<Parity>,
}

impl DebounceController {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            state: ActuatorState::Idle,
            last_issued: None,
        }
    }

    /// Procesa un tick: primero los acks recibidos, después la decisión
    pub fn update<S: AsRef<str>>(&mut self, parity: Parity, ack_lines: &[S]) -> Option<Command> {
        // 1) Acks en orden de llegada
        for line in ack_lines {
            if self.is_completion(line.as_ref()) {
                self.state = ActuatorState::Idle;
            }
        }

        // 2) Gesto soltado: rearmar
        let command = Command::from_parity(parity);
        let Some(command) = command else {
            self.last_issued = None;
            return None;
        };

        // 3) Actuador ocupado
        if self.state.is_busy() {
            return None;
        }

        // 4) Mismo gesto sostenido, ya atendido
        if self.last_issued == Some(parity) {
            return None;
        }

        // 5) Emitir
        self.state = ActuatorState::Busy;
        self.last_issued = Some(parity);
        Some(command)
    }

    /// Coincidencia exacta de subcadena (sensible a mayúsculas)
    pub fn is_completion(&self, line: &str) -> bool {
        line.contains(self.marker.as_str())
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn last_issued(&self) -> Option<Parity> {
        self.last_issued
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for DebounceController {
    fn default() -> Self {
        Self::new(COMPLETION_MARKER)
    }
}
