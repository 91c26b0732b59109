//! Printer adapters for sending a print surface to hardware
//!
//! Supports:
//! - Network label printers (raw ESC/POS on TCP port 9100)
//! - The platform print command (`lp` / `lpr`), fed the surface document

use crate::dispatcher::PrintSurface;
use crate::error::{PrintError, PrintResult};
use crate::escpos::{DEFAULT_DOTS_PER_MM, render_label};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Print the label held by a surface
    async fn print(&self, surface: &PrintSurface) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (TCP port 9100)
///
/// Renders the label tree to ESC/POS with the barcode as a raster image.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
    dots_per_mm: f32,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
            dots_per_mm: DEFAULT_DOTS_PER_MM,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Print head resolution (8 for 203 dpi, 12 for 300 dpi)
    pub fn with_dots_per_mm(mut self, dots_per_mm: f32) -> Self {
        self.dots_per_mm = dots_per_mm;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(surface), fields(addr = %self.addr, surface = surface.id()))]
    async fn print(&self, surface: &PrintSurface) -> PrintResult<()> {
        let data = render_label(surface.tree(), self.dots_per_mm);

        info!("Connecting to printer");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        info!("Connected, sending {} bytes", data.len());

        stream.write_all(&data).await?;
        stream.flush().await?;

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

/// Platform print command
///
/// Runs `<program> [-d <printer>] [args..] <surface file>`. The default
/// program is `lp`; CUPS honours the `@page` size of the surface document.
#[derive(Debug, Clone)]
pub struct CommandPrinter {
    program: String,
    printer_name: Option<String>,
    args: Vec<String>,
}

impl CommandPrinter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            printer_name: None,
            args: Vec::new(),
        }
    }

    /// Target a named queue instead of the system default
    pub fn with_printer(mut self, name: impl Into<String>) -> Self {
        self.printer_name = Some(name.into());
        self
    }

    /// Extra arguments placed before the file name
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed for a surface file
    pub fn command_args(&self, file: &Path) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len() + 3);
        if let Some(name) = &self.printer_name {
            out.push("-d".to_string());
            out.push(name.clone());
        }
        out.extend(self.args.iter().cloned());
        out.push(file.display().to_string());
        out
    }
}

impl Default for CommandPrinter {
    fn default() -> Self {
        Self::new("lp")
    }
}

impl Printer for CommandPrinter {
    #[instrument(skip(surface), fields(program = %self.program, surface = surface.id()))]
    async fn print(&self, surface: &PrintSurface) -> PrintResult<()> {
        let args = self.command_args(surface.path());
        info!(?args, "Running print command");

        let output = Command::new(&self.program).args(&args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, %stderr, "Print command failed");
            return Err(PrintError::CommandFailed {
                command: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        info!("Print job submitted");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_invalid_addr() {
        let result = NetworkPrinter::from_addr("invalid");
        assert!(matches!(result, Err(PrintError::InvalidConfig(_))));
    }

    #[test]
    fn test_command_args() {
        let printer = CommandPrinter::default()
            .with_printer("Zebra_GK420")
            .with_args(["-o", "fit-to-page"]);
        let args = printer.command_args(Path::new("/tmp/label.html"));
        assert_eq!(
            args,
            vec!["-d", "Zebra_GK420", "-o", "fit-to-page", "/tmp/label.html"]
        );
    }

    #[test]
    fn test_command_args_default_queue() {
        let args = CommandPrinter::new("lpr").command_args(Path::new("x.html"));
        assert_eq!(args, vec!["x.html"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_offline() {
        let printer = CommandPrinter::new("definitely-not-a-print-command-7f3a");
        assert!(!printer.is_online().await);
    }
}
