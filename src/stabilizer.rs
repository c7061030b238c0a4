use crate::types::{RawClass, StableClass, DEFAULT_HISTORY_SIZE, NO_GESTURE};
use std::collections::{BTreeMap, VecDeque};

/// Ventana deslizante de clasificaciones crudas con voto mayoritario
///
/// En caso de empate gana el valor numérico más pequeño, así el resultado
/// depende solo del contenido de la ventana y no del orden de llegada.
pub struct Stabilizer {
    history: VecDeque<RawClass>,
    capacity: usize,
}

impl Stabilizer {
    /// Crea un estabilizador con capacidad fija (mínimo 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Añade una observación y devuelve el valor estable resultante
    pub fn observe(&mut self, raw: RawClass) -> StableClass {
        self.history.push_back(raw);

        // Descartar las observaciones más antiguas (FIFO)
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        self.stable()
    }

    /// Valor mayoritario de la ventana actual (0 si está vacía)
    pub fn stable(&self) -> StableClass {
        let mut counts: BTreeMap<RawClass, usize> = BTreeMap::new();
        for &value in &self.history {
            *counts.entry(value).or_insert(0) += 1;
        }

        // BTreeMap itera en orden ascendente: solo un conteo estrictamente
        // mayor desplaza al candidato, de modo que el empate favorece al menor
        let mut best = NO_GESTURE;
        let mut best_count = 0;
        for (value, count) in counts {
            if count > best_count {
                best = value;
                best_count = count;
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Historial en orden de llegada (más antiguo primero)
    pub fn history(&self) -> impl Iterator<Item = RawClass> + '_ {
        self.history.iter().copied()
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
