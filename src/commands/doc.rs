//! Document CRUD commands.

use clap::Args;

use docket_core::Store;

use super::parse_document;

#[derive(Args)]
pub struct AddCommand {
    /// Collection to create the document in
    pub collection: String,

    /// Document payload as a JSON object
    #[arg(long, short)]
    pub data: String,
}

impl AddCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let document = parse_document(&self.data)?;
        let stored = store.add(&self.collection, document).await?;

        println!("{}", serde_json::to_string_pretty(&stored)?);
        Ok(())
    }
}

#[derive(Args)]
pub struct GetCommand {
    /// Collection holding the document
    pub collection: String,

    /// Document id
    pub id: String,
}

impl GetCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let document = store.get(&self.collection, &self.id).await?;

        println!("{}", serde_json::to_string_pretty(&document)?);
        Ok(())
    }
}

#[derive(Args)]
pub struct SetCommand {
    /// Collection holding the document
    pub collection: String,

    /// Document id
    pub id: String,

    /// Document payload as a JSON object
    #[arg(long, short)]
    pub data: String,

    /// Replace the stored document instead of merging fields into it
    #[arg(long)]
    pub overwrite: bool,
}

impl SetCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let document = parse_document(&self.data)?;
        let stored = store
            .put(&self.collection, &self.id, document, self.overwrite)
            .await?;

        println!("{}", serde_json::to_string_pretty(&stored)?);
        Ok(())
    }
}

#[derive(Args)]
pub struct RemoveCommand {
    /// Collection holding the document
    pub collection: String,

    /// Document id
    pub id: String,
}

impl RemoveCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        store.remove(&self.collection, &self.id).await?;

        println!("Removed {}.{}", self.collection, self.id);
        Ok(())
    }
}

#[derive(Args)]
pub struct ListCommand {
    /// Collection to list
    pub collection: String,
}

impl ListCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let documents = store.list(&self.collection).await?;

        if documents.is_empty() {
            println!("No documents in '{}'", self.collection);
            return Ok(());
        }
        for document in &documents {
            println!("{}", serde_json::to_string_pretty(document)?);
        }
        println!("{} document(s)", documents.len());
        Ok(())
    }
}
