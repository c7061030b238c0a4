use crate::command::Command;
use crate::types::COMPLETION_MARKER;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use serialport::{ClearBuffer, SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Valor de puerto que activa la detección automática
pub const AUTO_PORT: &str = "AUTO";

/// Fragmentos de descripción de adaptadores USB-serie habituales
const KNOWN_ADAPTERS: [&str; 4] = ["Arduino", "CH340", "USB Serial", "CP210"];

/// Capacidad de la cola de líneas entre el hilo lector y el bucle de ticks
const LINE_QUEUE_SIZE: usize = 256;

const RX_CHUNK: usize = 1024;

/// Límite de bytes pendientes sin terminador; al superarlo se entregan como línea
pub const RX_BUF_MAX: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("No se pudo abrir el puerto serie {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("No se pudieron enumerar los puertos serie: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("No se encontró ningún puerto serie")]
    NoPortFound,

    #[error("Error escribiendo en el enlace: {0}")]
    Write(#[from] io::Error),
}

/// Enlace dúplex con el actuador
///
/// `drain_lines` no bloquea: devuelve las líneas recibidas desde la llamada
/// anterior, en orden de llegada. Un fragmento sin terminador cuenta como
/// línea cuando la lectura agota su timeout.
pub trait CommandLink {
    fn drain_lines(&mut self) -> Vec<String>;

    fn send(&mut self, command: Command) -> Result<(), TransportError>;
}

/// Parámetros de apertura del puerto serie
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub settle_ms: u64,
}

/// Separa un flujo de bytes en líneas de texto
///
/// `\r` cuenta como fin de línea, las líneas vacías se descartan y las
/// secuencias UTF-8 inválidas se eliminan sin abortar la línea.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade bytes y devuelve las líneas completadas
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                lines.extend(self.flush());
                continue;
            }
            self.pending.push(byte);
            if self.pending.len() >= RX_BUF_MAX {
                lines.extend(self.flush());
            }
        }
        lines
    }

    /// Entrega lo pendiente como línea aunque no haya llegado el terminador
    pub fn flush(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        let text = decode_permissive(&raw);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Bytes pendientes sin terminador
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_permissive(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Enlace serie con hilo lector en segundo plano
///
/// El hilo lector entrega líneas por una cola acotada que el bucle de
/// ticks vacía una vez por tick. Al soltar el enlace el hilo se detiene.
pub struct SerialLink {
    writer: Box<dyn Write + Send>,
    lines: Receiver<String>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialLink {
    /// Abre el puerto, espera al reinicio del dispositivo y limpia la entrada
    pub fn open(settings: &SerialSettings) -> Result<Self, TransportError> {
        let open_err = |source| TransportError::Open {
            port: settings.port.clone(),
            source,
        };

        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(Duration::from_millis(settings.read_timeout_ms))
            .open()
            .map_err(open_err)?;

        if settings.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(settings.settle_ms));
        }
        if let Err(e) = port.clear(ClearBuffer::Input) {
            warn!("⚠️  No se pudo limpiar el buffer de entrada: {}", e);
        }

        let reader = port.try_clone().map_err(open_err)?;
        Ok(Self::from_io(reader, port))
    }

    /// Construye el enlace sobre mitades arbitrarias de lectura y escritura
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (tx, rx) = bounded::<String>(LINE_QUEUE_SIZE);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let handle = std::thread::spawn(move || read_lines(reader, tx, shutdown_clone));

        Self {
            writer: Box::new(writer),
            lines: rx,
            shutdown,
            reader: Some(handle),
        }
    }

    /// Indica si el hilo lector sigue activo
    pub fn reader_alive(&self) -> bool {
        self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl CommandLink for SerialLink {
    fn drain_lines(&mut self) -> Vec<String> {
        self.lines.try_iter().collect()
    }

    fn send(&mut self, command: Command) -> Result<(), TransportError> {
        self.writer.write_all(&command.frame())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

/// Bucle del hilo lector: termina en EOF, error de lectura o apagado
fn read_lines<R: Read>(mut reader: R, tx: Sender<String>, shutdown: Arc<AtomicBool>) {
    let mut splitter = LineSplitter::new();
    let mut chunk = [0u8; RX_CHUNK];

    while !shutdown.load(Ordering::Relaxed) {
        let n = match reader.read(&mut chunk) {
            Ok(0) => {
                if let Some(line) = splitter.flush() {
                    forward_line(&tx, line, &shutdown);
                }
                break;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                // Sin más bytes por ahora: lo pendiente se entrega tal cual
                if let Some(line) = splitter.flush() {
                    if !forward_line(&tx, line, &shutdown) {
                        return;
                    }
                }
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("❌ Error leyendo del enlace serie: {}", e);
                break;
            }
        };

        for line in splitter.push(&chunk[..n]) {
            if !forward_line(&tx, line, &shutdown) {
                return;
            }
        }
    }

    debug!("Hilo lector finalizado");
}

/// Entrega una línea respetando la cola acotada; false si hay que salir
fn forward_line(tx: &Sender<String>, line: String, shutdown: &AtomicBool) -> bool {
    let mut pending = line;
    loop {
        match tx.send_timeout(pending, Duration::from_millis(100)) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                pending = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// Actuador simulado: responde con el marcador `ack_after` ticks después de
/// cada comando (0 = en el tick siguiente)
#[derive(Debug)]
pub struct SimulatedActuator {
    ack_after: usize,
    marker: String,
    countdown: Option<usize>,
    sent: Vec<Command>,
}

impl SimulatedActuator {
    pub fn new(ack_after: usize) -> Self {
        Self::with_marker(ack_after, COMPLETION_MARKER)
    }

    pub fn with_marker(ack_after: usize, marker: impl Into<String>) -> Self {
        Self {
            ack_after,
            marker: marker.into(),
            countdown: None,
            sent: Vec::new(),
        }
    }

    /// Comandos recibidos en orden
    pub fn sent(&self) -> &[Command] {
        &self.sent
    }
}

impl CommandLink for SimulatedActuator {
    fn drain_lines(&mut self) -> Vec<String> {
        match self.countdown {
            Some(0) => {
                self.countdown = None;
                vec![format!("Robot: {}", self.marker)]
            }
            Some(n) => {
                self.countdown = Some(n - 1);
                vec!["Robot: moving".to_string()]
            }
            None => Vec::new(),
        }
    }

    fn send(&mut self, command: Command) -> Result<(), TransportError> {
        self.sent.push(command);
        self.countdown = Some(self.ack_after);
        Ok(())
    }
}

/// Puerto candidato con su descripción legible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    pub description: String,
}

impl From<&SerialPortInfo> for PortCandidate {
    fn from(info: &SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => [usb.manufacturer.as_deref(), usb.product.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::Unknown => String::new(),
        };
        Self {
            name: info.port_name.clone(),
            description,
        }
    }
}

/// Elige el primer adaptador conocido, o el primer puerto si no hay ninguno
pub fn pick_port(candidates: &[PortCandidate]) -> Option<String> {
    candidates
        .iter()
        .find(|c| KNOWN_ADAPTERS.iter().any(|k| c.description.contains(k)))
        .or_else(|| candidates.first())
        .map(|c| c.name.clone())
}

/// Enumera los puertos del sistema y elige uno
pub fn detect_port() -> Result<String, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    let candidates: Vec<PortCandidate> = ports.iter().map(PortCandidate::from).collect();
    for c in &candidates {
        debug!("Puerto disponible: {} ({})", c.name, c.description);
    }
    pick_port(&candidates).ok_or(TransportError::NoPortFound)
}

/// Resuelve el puerto configurado (`AUTO` lanza la detección)
pub fn resolve_port(configured: &str) -> Result<String, TransportError> {
    if configured.eq_ignore_ascii_case(AUTO_PORT) {
        detect_port()
    } else {
        Ok(configured.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Escritor compartido para inspeccionar lo enviado
    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "desconectado"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn wait_for_lines(link: &mut SerialLink, expected: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut lines = Vec::new();
        while lines.len() < expected && Instant::now() < deadline {
            lines.extend(link.drain_lines());
            std::thread::sleep(Duration::from_millis(5));
        }
        lines
    }

    #[test]
    fn test_splitter_handles_partial_lines() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"Task comp").is_empty());
        assert_eq!(splitter.pending_len(), 9);
        assert_eq!(splitter.push(b"leted\r\n"), vec!["Task completed"]);
        assert_eq!(splitter.pending_len(), 0);
    }

    #[test]
    fn test_splitter_skips_blank_and_trims() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"\r\n\n  moving  \nTask completed\n");
        assert_eq!(lines, vec!["moving", "Task completed"]);
    }

    #[test]
    fn test_splitter_drops_invalid_utf8() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"Task \xff\xfecompleted\n");
        assert_eq!(lines, vec!["Task completed"]);
    }

    #[test]
    fn test_splitter_flush_returns_unterminated_text() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"Robot: Task completed").is_empty());
        assert_eq!(splitter.flush().as_deref(), Some("Robot: Task completed"));
        assert_eq!(splitter.pending_len(), 0);
        assert_eq!(splitter.flush(), None);
    }

    #[test]
    fn test_splitter_caps_pending_bytes() {
        let mut splitter = LineSplitter::new();
        let block = [b'a'; 1024];
        let mut delivered = 0;
        for _ in 0..1000 {
            for line in splitter.push(&block) {
                assert_eq!(line.len(), RX_BUF_MAX);
                delivered += line.len();
            }
            assert!(splitter.pending_len() < RX_BUF_MAX);
        }
        assert_eq!(delivered + splitter.pending_len(), 1000 * 1024);
    }

    #[test]
    fn test_link_delivers_lines_in_order() {
        let input = Cursor::new(b"Robot ready\nTask completed\npartial".to_vec());
        let mut link = SerialLink::from_io(input, io::sink());
        let lines = wait_for_lines(&mut link, 3);
        assert_eq!(lines, vec!["Robot ready", "Task completed", "partial"]);
    }

    #[test]
    fn test_link_delivers_marker_without_newline() {
        let input = Cursor::new(b"Task completed".to_vec());
        let mut link = SerialLink::from_io(input, io::sink());
        let lines = wait_for_lines(&mut link, 1);
        assert_eq!(lines, vec!["Task completed"]);
    }

    /// Lector que entrega un fragmento y después solo agota el timeout
    struct StalledReader {
        chunk: Option<&'static [u8]>,
    }

    impl Read for StalledReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunk.take() {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                None => {
                    std::thread::sleep(Duration::from_millis(5));
                    Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
                }
            }
        }
    }

    #[test]
    fn test_read_timeout_flushes_partial_line() {
        let reader = StalledReader {
            chunk: Some(b"Robot: Task completed"),
        };
        let mut link = SerialLink::from_io(reader, io::sink());
        let lines = wait_for_lines(&mut link, 1);
        assert_eq!(lines, vec!["Robot: Task completed"]);
        assert!(link.reader_alive());
    }

    #[test]
    fn test_link_writes_command_frame() {
        let writer = SharedWriter::default();
        let mut link = SerialLink::from_io(io::empty(), writer.clone());
        link.send(Command::Odd).unwrap();
        link.send(Command::Even).unwrap();
        assert_eq!(writer.0.lock().unwrap().as_slice(), b"1\n0\n");
    }

    #[test]
    fn test_link_reports_write_failure() {
        let mut link = SerialLink::from_io(io::empty(), BrokenWriter);
        assert!(matches!(link.send(Command::Odd), Err(TransportError::Write(_))));
    }

    #[test]
    fn test_reader_stops_on_eof() {
        let link = SerialLink::from_io(io::empty(), io::sink());
        let deadline = Instant::now() + Duration::from_secs(2);
        while link.reader_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!link.reader_alive());
    }

    #[test]
    fn test_simulated_actuator_acks_after_delay() {
        let mut sim = SimulatedActuator::new(2);
        assert!(sim.drain_lines().is_empty());
        sim.send(Command::Even).unwrap();

        assert_eq!(sim.drain_lines(), vec!["Robot: moving"]);
        assert_eq!(sim.drain_lines(), vec!["Robot: moving"]);
        assert_eq!(sim.drain_lines(), vec!["Robot: Task completed"]);
        assert!(sim.drain_lines().is_empty());
        assert_eq!(sim.sent(), &[Command::Even]);
    }

    #[test]
    fn test_pick_known_adapter_first() {
        let candidates = vec![
            PortCandidate {
                name: "/dev/ttyS0".into(),
                description: String::new(),
            },
            PortCandidate {
                name: "/dev/ttyUSB0".into(),
                description: "QinHeng Electronics USB Serial".into(),
            },
        ];
        assert_eq!(pick_port(&candidates).as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn test_pick_falls_back_to_first() {
        let candidates = vec![
            PortCandidate {
                name: "COM1".into(),
                description: "PCI".into(),
            },
            PortCandidate {
                name: "COM7".into(),
                description: "Bluetooth".into(),
            },
        ];
        assert_eq!(pick_port(&candidates).as_deref(), Some("COM1"));
        assert_eq!(pick_port(&[]), None);
    }

    #[test]
    fn test_explicit_port_not_detected() {
        assert_eq!(resolve_port("COM4").unwrap(), "COM4");
    }
}
