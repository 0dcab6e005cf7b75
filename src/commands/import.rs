//! Bulk import through the buffered write path.
//!
//! Reads JSON Lines from a file or stdin and feeds every record through
//! the debounce scheduler, so repeated records for the same document
//! coalesce into a single backend write. The process does not exit while
//! the shutdown guard still reports unflushed writes - including when the
//! wait is interrupted by ctrl-c.

use clap::Args;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use docket_core::{generate_document_id, Store};

use super::parse_document;

#[derive(Args)]
pub struct ImportCommand {
    /// Collection to import into
    pub collection: String,

    /// JSON Lines file to read; stdin when omitted
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Replace stored documents instead of merging fields into them
    #[arg(long)]
    pub overwrite: bool,
}

impl ImportCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let reader: Box<dyn BufRead> = match &self.file {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(BufReader::new(io::stdin())),
        };

        let mut tickets = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let mut document = match parse_document(&line) {
                Ok(document) => document,
                Err(e) => {
                    eprintln!("Skipping line {}: {}", number + 1, e);
                    continue;
                }
            };

            // An explicit "id" field addresses an existing document;
            // records without one get a generated id.
            let id = match document.remove("id") {
                Some(serde_json::Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => generate_document_id(),
            };

            let ticket = store
                .write(&self.collection, &id, document, self.overwrite, true)
                .await?;
            tickets.push(ticket);
        }

        tracing::debug!("Queued {} buffered write(s)", tickets.len());
        self.drain(store).await;

        let (mut imported, mut failed) = (0, 0);
        for ticket in tickets {
            match ticket.wait().await {
                Ok(_) => imported += 1,
                Err(e) => {
                    eprintln!("Write failed: {}", e);
                    failed += 1;
                }
            }
        }

        println!("Imported {} document(s), {} failed", imported, failed);
        Ok(())
    }

    /// Waits for every buffered write to flush before letting the
    /// process move toward exit.
    async fn drain(&self, store: &Store) {
        let guard = store.shutdown_guard();
        let Err(pending) = guard.check() else {
            return;
        };
        eprintln!("Waiting for {}", pending);

        loop {
            tokio::select! {
                _ = guard.wait_idle() => return,
                _ = tokio::signal::ctrl_c() => {
                    if let Err(pending) = guard.check() {
                        eprintln!("Cannot exit yet: {}", pending);
                    }
                }
            }
        }
    }
}
