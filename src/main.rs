use std::io::Write;

use chatstream::config::{load_config, AppConfig};
use chatstream::observability::init_tracing;
use chatstream::session::ChatSession;
use chatstream::stream::{MessageSink, TurnEnd};
use chatstream::transport::GatewayClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Prints only the newly streamed suffix of the assistant message.
///
/// Goes quiet after the first write error (e.g. a closed pipe).
struct TerminalPrinter<W: Write> {
    out: W,
    printed: usize,
    failed: Option<std::io::Error>,
}

impl<W: Write> TerminalPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            failed: None,
        }
    }
}

impl<W: Write> MessageSink for TerminalPrinter<W> {
    fn on_content(&mut self, content: &str) {
        if self.failed.is_some() {
            return;
        }
        let Some(fresh) = content.get(self.printed..) else {
            return;
        };
        let written = self
            .out
            .write_all(fresh.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(err) = written {
            self.failed = Some(err);
            return;
        }
        self.printed = content.len();
    }
}

fn write_flushed(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration from '{config_path}': {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level);

    // The decoder is single-threaded; one cooperative thread is all it needs.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    runtime.block_on(async move {
        run(config).await;
    });
}

async fn run(config: AppConfig) {
    let client = GatewayClient::new(&config.gateway).unwrap_or_else(|e| {
        eprintln!("Failed to create gateway client: {e}");
        std::process::exit(1);
    });
    tracing::info!(
        "chatstream connected to {} with model '{}'",
        client.chat_url(),
        config.gateway.model
    );

    let mut session = ChatSession::new(client, config.chat, config.gateway.model);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if let Err(err) = write_flushed("> ") {
            tracing::warn!("stdout closed, stopping: {err}");
            break;
        }

        let prompt = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("Failed to read input: {err}");
                break;
            }
        };
        let prompt = prompt.trim();
        match prompt {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                session.reset();
                if let Err(err) = write_flushed("(conversation cleared)\n") {
                    tracing::warn!("stdout closed, stopping: {err}");
                    break;
                }
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let mut printer = TerminalPrinter::new(std::io::stdout());
        let report = session.send(prompt, &cancel, &mut printer).await;
        watcher.abort();

        if let Some(err) = printer.failed {
            tracing::warn!("stdout closed, stopping: {err}");
            break;
        }
        let trailer = if report.outcome.end == TurnEnd::Cancelled {
            " [cancelled]\n".to_string()
        } else if report.is_success() {
            "\n".to_string()
        } else {
            let notice = session.log().last().map_or("", |m| m.content.as_str());
            let lead = if printer.printed > 0 { "\n" } else { "" };
            format!("{lead}{notice}\n")
        };
        if let Err(err) = write_flushed(&trailer) {
            tracing::warn!("stdout closed, stopping: {err}");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `budget` writes, then fails like a closed pipe.
    struct ClosingPipe {
        written: Vec<u8>,
        budget: usize,
        attempts: usize,
    }

    impl Write for ClosingPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            if self.budget == 0 {
                return Err(std::io::ErrorKind::BrokenPipe.into());
            }
            self.budget -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_printer_writes_only_new_suffix() {
        let mut printer = TerminalPrinter::new(Vec::new());
        printer.on_content("Olá");
        printer.on_content("Olá, tudo");
        printer.on_content("Olá, tudo bem?");

        assert_eq!(printer.out, "Olá, tudo bem?".as_bytes());
        assert!(printer.failed.is_none());
    }

    #[test]
    fn test_printer_stops_after_first_write_error() {
        let pipe = ClosingPipe {
            written: Vec::new(),
            budget: 1,
            attempts: 0,
        };
        let mut printer = TerminalPrinter::new(pipe);
        printer.on_content("a");
        printer.on_content("ab");
        printer.on_content("abc");

        assert_eq!(printer.out.written, b"a");
        assert_eq!(printer.out.attempts, 2);
        assert_eq!(printer.printed, 1);
        assert!(printer.failed.is_some());
    }
}
