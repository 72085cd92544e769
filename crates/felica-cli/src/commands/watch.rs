use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use felica_card::{scan_card, CardReader, PcscSession, ScanConfig, ScanReport};
use tracing::{debug, info, warn};

use crate::formatters::FormatMode;

use super::history::print_report;

/// Messages sent from the card worker to the foreground
#[derive(Debug)]
pub enum CardEvent {
    /// Card was detected
    CardDetected { reader_name: String },
    /// Card was removed
    CardRemoved,
    /// Card history was read
    ReportReady(Box<ScanReport>),
    /// Error occurred
    Error { message: String },
    /// Reader is unavailable
    ReaderUnavailable { error: String },
    /// Reader became available
    ReaderAvailable,
}

/// Commands sent to the card worker
#[derive(Debug)]
pub enum CardCommand {
    /// Stop the worker thread
    Stop,
}

/// Reader availability as last reported to the foreground
///
/// The worker retries a missing reader every two seconds; only the first
/// failure after the reader was last seen is worth reporting.
#[derive(Debug, Default)]
struct ReaderStatus {
    unavailable_reported: bool,
}

impl ReaderStatus {
    /// Record a failed reader lookup, returns whether to report it
    fn failed(&mut self) -> bool {
        !std::mem::replace(&mut self.unavailable_reported, true)
    }

    /// Record a reader that came up
    fn available(&mut self) {
        self.unavailable_reported = false;
    }
}

/// Background worker scanning every card presented to the reader
pub struct CardWorker {
    reader_name: Option<String>,
    config: ScanConfig,
    event_tx: Sender<CardEvent>,
    command_rx: Receiver<CardCommand>,
}

impl CardWorker {
    /// Spawn a new card worker thread
    pub fn spawn(
        reader_name: Option<String>,
        config: ScanConfig,
    ) -> (Receiver<CardEvent>, Sender<CardCommand>) {
        let (event_tx, event_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();

        thread::spawn(move || {
            let worker = CardWorker {
                reader_name,
                config,
                event_tx,
                command_rx,
            };
            worker.run();
        });

        (event_rx, command_tx)
    }

    fn run(self) {
        info!("Card worker thread started");

        let mut reader: Option<CardReader> = None;
        let mut status = ReaderStatus::default();
        let mut card_present = false;
        let mut last_reader_check: Option<Instant> = None;

        loop {
            // Check for stop command (non-blocking)
            if let Ok(CardCommand::Stop) = self.command_rx.try_recv() {
                info!("Card worker stopping");
                break;
            }

            // Try to get reader if we don't have one (check every 2 seconds)
            let check_due =
                last_reader_check.is_none_or(|at| at.elapsed() > Duration::from_secs(2));
            if reader.is_none() && check_due {
                match CardReader::new() {
                    Ok(r) => {
                        info!("Card reader initialized");
                        reader = Some(r);
                        status.available();
                        let _ = self.event_tx.send(CardEvent::ReaderAvailable);
                    }
                    Err(e) => {
                        debug!("Card reader unavailable: {}", e);
                        if status.failed() {
                            let _ = self.event_tx.send(CardEvent::ReaderUnavailable {
                                error: format!("{}", e),
                            });
                        }
                    }
                }
                last_reader_check = Some(Instant::now());
            }

            if let Some(ref r) = reader {
                let connected = match self.reader_name.as_deref() {
                    Some(name) => r.connect_named(name).map(|card| (card, name.to_string())),
                    None => r.connect_first(),
                };

                match connected {
                    Ok((card, reader_name)) => {
                        if !card_present {
                            info!(reader = %reader_name, "Card detected");
                            card_present = true;
                            let _ = self.event_tx.send(CardEvent::CardDetected { reader_name });
                            self.scan(card);
                        }
                    }
                    Err(pcsc::Error::NoReadersAvailable) | Err(pcsc::Error::UnknownReader) => {
                        warn!("Card reader disappeared");
                        reader = None;
                        card_present = false;
                    }
                    Err(_) => {
                        if card_present {
                            info!("Card removed");
                            card_present = false;
                            let _ = self.event_tx.send(CardEvent::CardRemoved);
                        }
                    }
                }
            }

            // Sleep briefly to avoid busy loop
            thread::sleep(Duration::from_millis(250));
        }

        info!("Card worker thread stopped");
    }

    fn scan(&self, card: pcsc::Card) {
        let result = PcscSession::start(card, self.config.transceive_timeout)
            .map_err(felica_card::ScanError::from)
            .and_then(|session| scan_card(session, &self.config));

        let event = match result {
            Ok(report) => CardEvent::ReportReady(Box::new(report)),
            Err(e) => {
                warn!(error = %e, "Failed to read card");
                CardEvent::Error {
                    message: format!("Failed to read card: {}", e),
                }
            }
        };
        let _ = self.event_tx.send(event);
    }
}

/// Scan every card presented until interrupted, or after `limit` cards
pub fn cmd_watch(
    reader_name: Option<&str>,
    config: &ScanConfig,
    format_mode: FormatMode,
    limit: Option<usize>,
) {
    println!("FeliCa History Reader - watching for cards (Ctrl-C to stop)\n");

    let (event_rx, command_tx) = CardWorker::spawn(reader_name.map(str::to_string), *config);
    let mut scanned = 0usize;

    for event in event_rx.iter() {
        debug!("Card event: {:?}", event);

        match event {
            CardEvent::ReaderAvailable => println!("Reader ready, present a card"),
            CardEvent::ReaderUnavailable { error } => {
                eprintln!("Waiting for reader: {}", error);
            }
            CardEvent::CardDetected { reader_name } => {
                println!("Card detected on {}\n", reader_name)
            }
            CardEvent::CardRemoved => println!("Card removed\n"),
            CardEvent::ReportReady(report) => {
                print_report(&report, format_mode);
                scanned += 1;
            }
            CardEvent::Error { message } => {
                eprintln!("{}", message);
                scanned += 1;
            }
        }

        if limit.is_some_and(|limit| scanned >= limit) {
            let _ = command_tx.send(CardCommand::Stop);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_failure_reported_once_per_outage() {
        let mut status = ReaderStatus::default();

        // Repeated retries while the reader stays missing
        assert!(status.failed());
        assert!(!status.failed());
        assert!(!status.failed());

        // Reader comes back, then goes away again
        status.available();
        assert!(status.failed());
        assert!(!status.failed());
    }
}
