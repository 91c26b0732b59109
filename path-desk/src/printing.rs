//! Printer selection
//!
//! Labels go to a raw ESC/POS printer when `PRINTER_ADDR` is set, otherwise
//! through the platform print command.

use path_printer::{
    CommandPrinter, NetworkPrinter, PrintDispatcher, PrintResult, PrintSurface, Printer,
};
use shared::AppResult;
use tracing::info;

use crate::core::DeskConfig;

/// The printer configured for this desk
#[derive(Debug, Clone)]
pub enum LabelPrinter {
    Command(CommandPrinter),
    Network(NetworkPrinter),
}

impl LabelPrinter {
    pub fn from_config(config: &DeskConfig) -> AppResult<Self> {
        if let Some(addr) = &config.printer_addr {
            let printer =
                NetworkPrinter::from_addr(addr)?.with_dots_per_mm(config.printer_dots_per_mm);
            info!(addr = %printer.addr(), "Using network label printer");
            return Ok(Self::Network(printer));
        }

        let mut printer = CommandPrinter::new(&config.print_command);
        if let Some(name) = &config.printer_name {
            printer = printer.with_printer(name);
        }
        info!(program = printer.program(), queue = ?config.printer_name, "Using print command");
        Ok(Self::Command(printer))
    }
}

impl Printer for LabelPrinter {
    async fn print(&self, surface: &PrintSurface) -> PrintResult<()> {
        match self {
            Self::Command(p) => p.print(surface).await,
            Self::Network(p) => p.print(surface).await,
        }
    }

    async fn is_online(&self) -> bool {
        match self {
            Self::Command(p) => p.is_online().await,
            Self::Network(p) => p.is_online().await,
        }
    }
}

/// Dispatcher anchored in the spool directory with the configured settle
pub fn dispatcher(config: &DeskConfig) -> AppResult<PrintDispatcher<LabelPrinter>> {
    let printer = LabelPrinter::from_config(config)?;
    Ok(PrintDispatcher::new(&config.spool_dir, printer).with_settle(config.print_settle()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config(pairs: &[(&str, &str)]) -> DeskConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeskConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_print_command_by_default() {
        let printer = LabelPrinter::from_config(&config(&[("PRINTER_NAME", "Zebra")])).unwrap();
        let LabelPrinter::Command(cmd) = printer else {
            panic!("expected command printer");
        };
        assert_eq!(cmd.program(), "lp");
        let args = cmd.command_args(std::path::Path::new("/tmp/label.html"));
        assert_eq!(args, vec!["-d", "Zebra", "/tmp/label.html"]);
    }

    #[test]
    fn test_printer_addr_selects_network() {
        let printer =
            LabelPrinter::from_config(&config(&[("PRINTER_ADDR", "192.168.1.50:9100")])).unwrap();
        let LabelPrinter::Network(net) = printer else {
            panic!("expected network printer");
        };
        assert_eq!(net.addr().to_string(), "192.168.1.50:9100");
    }

    #[test]
    fn test_bad_printer_addr() {
        let err =
            LabelPrinter::from_config(&config(&[("PRINTER_ADDR", "printer-1")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_dispatcher_uses_spool_and_settle() {
        let dir = tempfile::tempdir().unwrap();
        let spool = dir.path().to_string_lossy().to_string();
        let d = dispatcher(&config(&[("SPOOL_DIR", &spool), ("PRINT_SETTLE_MS", "0")])).unwrap();
        assert_eq!(d.anchor(), dir.path());
        assert!(d.pending_surface().is_none());
    }
}
