use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;

use crate::types::RawClass;

#[derive(Debug, Deserialize)]
struct CountRecord {
    tick: usize,
    count: RawClass,
}

/// Carga una secuencia de conteos desde un CSV con cabecera `tick,count`.
/// Los ticks ausentes repiten el último conteo válido.
pub fn load_counts_from_csv(path: impl AsRef<Path>) -> Result<Vec<RawClass>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let mut samples: BTreeMap<usize, RawClass> = BTreeMap::new();

    for (row_idx, result) in reader.deserialize::<CountRecord>().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
        if samples.insert(record.tick, record.count).is_some() {
            bail!("Tick {} duplicado (fila {})", record.tick, row_idx + 1);
        }
    }

    let (Some((&first, _)), Some((&last, _))) = (samples.first_key_value(), samples.last_key_value())
    else {
        bail!("El CSV {:?} no contiene datos", path);
    };
    ensure!(
        first == 0,
        "El CSV debe iniciar en tick=0 (encontrado tick={})",
        first
    );

    let mut counts = Vec::with_capacity(last + 1);
    let mut last_count = 0;
    for tick in 0..=last {
        if let Some(&count) = samples.get(&tick) {
            last_count = count;
        }
        // Rellenar huecos repitiendo el último conteo
        counts.push(last_count);
    }

    Ok(counts)
}
