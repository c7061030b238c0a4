use crate::types::{StableClass, NO_GESTURE};

/// Paridad del valor estable; `None` cuando no hay gesto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Odd,
    Even,
    None,
}

impl Parity {
    pub fn is_gesture(self) -> bool {
        !matches!(self, Parity::None)
    }
}

/// Comando binario que se envía al actuador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Odd,
    Even,
}

impl Command {
    /// Byte ASCII que viaja por el enlace serie
    pub fn byte(self) -> u8 {
        match self {
            Command::Odd => b'1',
            Command::Even => b'0',
        }
    }

    /// Trama completa: byte + terminador de línea
    pub fn frame(self) -> [u8; 2] {
        [self.byte(), b'\n']
    }

    pub fn label(self) -> &'static str {
        match self {
            Command::Odd => "IMPAR",
            Command::Even => "PAR",
        }
    }

    pub fn parity(self) -> Parity {
        match self {
            Command::Odd => Parity::Odd,
            Command::Even => Parity::Even,
        }
    }

    /// Conversión paridad → comando (`None` no genera comando)
    pub fn from_parity(parity: Parity) -> Option<Self> {
        match parity {
            Parity::Odd => Some(Command::Odd),
            Parity::Even => Some(Command::Even),
            Parity::None => None,
        }
    }
}

/// Mapea el valor estable a su paridad
pub fn map_parity(stable: StableClass) -> Parity {
    if stable == NO_GESTURE {
        Parity::None
    } else if stable % 2 == 1 {
        Parity::Odd
    } else {
        Parity::Even
    }
}
