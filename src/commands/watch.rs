//! Realtime document watching.

use clap::Args;

use docket_core::{Store, WatchEvent};

#[derive(Args)]
pub struct WatchCommand {
    /// Collection holding the document
    pub collection: String,

    /// Document id
    pub id: String,
}

impl WatchCommand {
    /// Streams updates for one document until ctrl-c.
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let mut watcher = store.watch(&self.collection, &self.id).await?;
        eprintln!(
            "Watching {}.{} (ctrl-c to stop)",
            self.collection, self.id
        );

        loop {
            tokio::select! {
                event = watcher.next() => match event {
                    Some(WatchEvent::Updated(document)) => {
                        println!("{}", serde_json::to_string_pretty(&document)?);
                    }
                    Some(WatchEvent::Removed) => {
                        println!("Document {}.{} was removed", self.collection, self.id);
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        Ok(())
    }
}
