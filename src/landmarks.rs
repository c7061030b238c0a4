use crate::types::RawClass;
use thiserror::Error;

/// Número de landmarks de una mano (modelo de 21 puntos)
pub const NUM_LANDMARKS: usize = 21;

const THUMB_IP: usize = 3;
const THUMB_TIP: usize = 4;
const PINKY_TIP: usize = 20;
const FINGER_TIPS: [usize; 4] = [8, 12, 16, 20];
const FINGER_PIPS: [usize; 4] = [6, 10, 14, 18];

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
    #[error("Cantidad de valores inválida: se esperaban 42 (x,y) o 63 (x,y,z), se recibieron {0}")]
    InvalidLength(usize),

    #[error("Valor no numérico en la posición {index}: {value:?}")]
    InvalidNumber { index: usize, value: String },
}

/// Coordenadas normalizadas de imagen (y crece hacia abajo)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// Los 21 landmarks de una mano detectada
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; NUM_LANDMARKS],
}

impl HandLandmarks {
    /// Parsea una fila CSV de 42 (x,y) o 63 (x,y,z) valores; z se ignora
    pub fn parse_row(row: &str) -> Result<Self, LandmarkError> {
        let values: Vec<&str> = row.split(',').map(str::trim).collect();
        let stride = match values.len() {
            n if n == NUM_LANDMARKS * 2 => 2,
            n if n == NUM_LANDMARKS * 3 => 3,
            n => return Err(LandmarkError::InvalidLength(n)),
        };

        let parse = |index: usize| -> Result<f32, LandmarkError> {
            values[index]
                .parse::<f32>()
                .map_err(|_| LandmarkError::InvalidNumber {
                    index,
                    value: values[index].to_string(),
                })
        };

        let mut points = [Landmark::default(); NUM_LANDMARKS];
        for (i, point) in points.iter_mut().enumerate() {
            point.x = parse(i * stride)?;
            point.y = parse(i * stride + 1)?;
        }

        Ok(Self { points })
    }

    /// Cuenta los dedos extendidos (0..=5)
    ///
    /// Un dedo largo está extendido si la punta queda por encima de su
    /// articulación PIP. El pulgar se evalúa en x, y el sentido depende de
    /// si la punta del pulgar queda a la izquierda del meñique (mano
    /// izquierda o derecha en imagen espejada).
    pub fn count_extended_fingers(&self) -> RawClass {
        let p = &self.points;

        let fingers = FINGER_TIPS
            .iter()
            .zip(FINGER_PIPS.iter())
            .filter(|&(&tip, &pip)| p[tip].y < p[pip].y)
            .count();

        let thumb = if p[THUMB_TIP].x < p[PINKY_TIP].x {
            p[THUMB_TIP].x < p[THUMB_IP].x
        } else {
            p[THUMB_TIP].x > p[THUMB_IP].x
        };

        (fingers + usize::from(thumb)) as RawClass
    }
}
