/// Clasificación cruda por frame: número de dedos extendidos (0 = sin gesto)
pub type RawClass = u8;

/// Valor mayoritario de la ventana de historial
pub type StableClass = RawClass;

/// Clase neutra: no hay mano o no hay dedos extendidos
pub const NO_GESTURE: RawClass = 0;

/// Constantes del sistema
pub const DEFAULT_HISTORY_SIZE: usize = 15;
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_SETTLE_MS: u64 = 1200; // el Arduino se reinicia al abrir el puerto
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const COMPLETION_MARKER: &str = "Task completed";

/// Estado del actuador remoto (robot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorState {
    #[default]
    Idle,
    Busy,
}

impl ActuatorState {
    pub fn is_busy(self) -> bool {
        matches!(self, ActuatorState::Busy)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActuatorState::Idle => "IDLE",
            ActuatorState::Busy => "BUSY",
        }
    }
}

impl std::fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
