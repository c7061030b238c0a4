use crate::landmarks::{HandLandmarks, LandmarkError};
use crate::types::{RawClass, NO_GESTURE};
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Separador entre manos cuando una línea trae varias detecciones
const HAND_SEPARATOR: char = ';';

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Conteo inválido: {0:?}")]
    InvalidCount(String),

    #[error("Landmarks inválidos: {0}")]
    Landmarks(#[from] LandmarkError),
}

/// Convierte una línea del protocolo de entrada en una clasificación cruda
///
/// Formatos aceptados:
/// - línea vacía: no hay mano (0)
/// - un entero: conteo ya calculado
/// - 42 o 63 valores separados por comas: landmarks de una mano
///
/// Varias manos separadas por `;` se procesan en orden y prevalece la última.
pub fn parse_frame_line(line: &str) -> Result<RawClass, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(NO_GESTURE);
    }

    if !line.contains(',') {
        return line
            .parse::<RawClass>()
            .map_err(|_| SourceError::InvalidCount(line.to_string()));
    }

    let mut count = NO_GESTURE;
    for hand in line.split(HAND_SEPARATOR).filter(|h| !h.trim().is_empty()) {
        count = HandLandmarks::parse_row(hand)?.count_extended_fingers();
    }
    Ok(count)
}

/// Lanza un hilo que lee frames línea a línea y los envía por el canal
///
/// El canal se cierra (fuente agotada) en EOF, error de lectura, o cuando
/// el receptor desaparece. Las líneas mal formadas se descartan.
pub fn spawn_line_source<R>(reader: R, tx: Sender<RawClass>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for (idx, chunk) in reader.split(b'\n').enumerate() {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("❌ Error leyendo la fuente de frames: {}", e);
                    break;
                }
            };

            let line = String::from_utf8_lossy(&bytes);
            match parse_frame_line(&line) {
                Ok(raw) => {
                    if tx.send(raw).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("⚠️  Frame {} descartado: {}", idx, e),
            }
        }
        debug!("Fuente de frames agotada");
    })
}

/// Lanza un hilo que reproduce una secuencia grabada a ritmo fijo
pub fn spawn_replay_source(
    counts: Vec<RawClass>,
    tx: Sender<RawClass>,
    interval: Duration,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for raw in counts {
            if tx.send(raw).is_err() {
                break;
            }
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
    })
}
