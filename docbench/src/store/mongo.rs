use std::{future::IntoFuture, time::Duration};

use async_trait::async_trait;
use mongodb::{
    Client, Collection, Database,
    bson::{self, Bson, Document, doc},
    options::{ClientOptions, ServerApi, ServerApiVersion, Tls, TlsOptions},
};

use super::{DocumentStore, Filter, Update};
use crate::{
    error::StoreError,
    record::{RecordId, SyntheticRecord},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
const APP_NAME: &str = "docbench";

/// Store backed by a MongoDB-compatible server.
///
/// Driver-level retries are disabled: the benchmark measures single attempts.
/// Every storage call is bounded by its own timeout on top of the run deadline.
pub struct MongoStore {
    client: Client,
    database: Database,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect to `uri` and ping the server. A failed ping is a failed connect.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        tls: bool,
    ) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        configure(&mut options, tls);

        let client = Client::with_options(options)?;
        let database = client.database(database);

        tracing::info!("Pinging {uri}...");
        match tokio::time::timeout(PING_TIMEOUT, database.run_command(doc! { "ping": 1 })).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                client.shutdown().await;
                return Err(err.into());
            }
            Err(_) => {
                client.shutdown().await;
                return Err(StoreError::Unavailable(format!(
                    "no ping response within {PING_TIMEOUT:?}"
                )));
            }
        }

        let collection = database.collection::<Document>(collection);
        Ok(Self {
            client,
            database,
            collection,
        })
    }
}

/// Apply the benchmark's fixed client settings on top of whatever the URI set.
///
/// Pins the stable API to V1 and leaves wire compression off (no compressor
/// features are built in). With `tls` on, TLS options from the URI are kept;
/// rustls never negotiates below TLS 1.2.
pub fn configure(options: &mut ClientOptions, tls: bool) {
    options.app_name = Some(APP_NAME.to_owned());
    options.connect_timeout = Some(CONNECT_TIMEOUT);
    options.server_selection_timeout = Some(CONNECT_TIMEOUT);
    options.retry_writes = Some(false);
    options.retry_reads = Some(false);
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    options.tls = match (tls, options.tls.take()) {
        (true, Some(Tls::Enabled(from_uri))) => Some(Tls::Enabled(from_uri)),
        (true, _) => Some(Tls::Enabled(TlsOptions::default())),
        (false, _) => Some(Tls::Disabled),
    };
}

/// Run one driver call, failing it once [`OPERATION_TIMEOUT`] has passed.
async fn bounded<T, F>(call: F) -> Result<T, StoreError>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    within(OPERATION_TIMEOUT, call).await
}

async fn within<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StoreError::Unavailable(format!("no response within {limit:?}"))),
    }
}

fn to_document(record: &SyntheticRecord) -> Document {
    doc! {
        "name": record.name.as_str(),
        "value": record.value,
        "data": record.payload.as_str(),
        "timestamp": bson::DateTime::from_system_time(record.timestamp),
    }
}

fn to_filter(filter: Filter) -> Document {
    match filter {
        Filter::All => Document::new(),
        Filter::ValueEq(value) => doc! { "value": value },
    }
}

fn to_update(update: Update) -> Document {
    match update {
        Update::SetValue(value) => doc! { "$set": { "value": value } },
    }
}

fn to_record_id(id: Bson) -> RecordId {
    match id {
        Bson::ObjectId(oid) => RecordId(oid.to_hex()),
        other => RecordId(other.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, record: SyntheticRecord) -> Result<RecordId, StoreError> {
        let result = bounded(self.collection.insert_one(to_document(&record))).await?;
        Ok(to_record_id(result.inserted_id))
    }

    async fn update_one(&self, filter: Filter, update: Update) -> Result<bool, StoreError> {
        let result = bounded(
            self.collection
                .update_one(to_filter(filter), to_update(update)),
        )
        .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_one(&self, filter: Filter) -> Result<bool, StoreError> {
        let result = bounded(self.collection.delete_one(to_filter(filter))).await?;
        Ok(result.deleted_count > 0)
    }

    async fn drop_dataset(&self) -> Result<(), StoreError> {
        bounded(self.database.drop()).await
    }

    async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
        bounded(self.collection.count_documents(to_filter(filter))).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
