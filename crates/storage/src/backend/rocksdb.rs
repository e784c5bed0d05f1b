//! RocksDB storage backend.

use crate::api::{
    ALL_TABLES, Error, PrefixResult, StorageBackend, StorageReadView, StorageWriteBatch, Table,
};
use rocksdb::{
    ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch, WriteOptions,
};
use std::path::Path;
use std::sync::Arc;

/// Returns the column family name for a table.
fn cf_name(table: Table) -> &'static str {
    match table {
        Table::SignedBlocks => "signed_blocks",
        Table::SignedAttestations => "signed_attestations",
        Table::IndexedAttestations => "indexed_attestations",
        Table::MinMaxSpans => "min_max_spans",
        Table::Metadata => "metadata",
    }
}

/// RocksDB storage backend.
#[derive(Clone)]
pub struct RocksDBBackend {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksDBBackend {
    /// Open a RocksDB database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = ALL_TABLES
            .iter()
            .map(|t| ColumnFamilyDescriptor::new(cf_name(*t), Options::default()))
            .collect();

        let db =
            DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StorageBackend for RocksDBBackend {
    fn begin_read(&self) -> Result<Box<dyn StorageReadView + '_>, Error> {
        Ok(Box::new(RocksDBReadView {
            db: Arc::clone(&self.db),
        }))
    }

    fn begin_write(&self) -> Result<Box<dyn StorageWriteBatch + 'static>, Error> {
        Ok(Box::new(RocksDBWriteBatch {
            db: Arc::clone(&self.db),
            batch: WriteBatch::default(),
        }))
    }
}

/// Read-only view into RocksDB.
struct RocksDBReadView {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl StorageReadView for RocksDBReadView {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let cf = self
            .db
            .cf_handle(cf_name(table))
            .ok_or_else(|| format!("Column family {} not found", cf_name(table)))?;

        Ok(self.db.get_cf(&cf, key)?)
    }

    fn prefix_iterator(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Box<dyn Iterator<Item = PrefixResult> + '_>, Error> {
        let cf = self
            .db
            .cf_handle(cf_name(table))
            .ok_or_else(|| format!("Column family {} not found", cf_name(table)))?;

        let prefix_owned = prefix.to_vec();
        let iter = self
            .db
            .prefix_iterator_cf(&cf, prefix)
            .map(|result| result.map_err(|e| Box::new(e) as Error))
            .take_while(move |result| match result {
                Ok((key, _)) => key.starts_with(&prefix_owned),
                Err(_) => true, // propagate errors
            });

        Ok(Box::new(iter))
    }
}

/// Write batch for RocksDB.
struct RocksDBWriteBatch {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    batch: WriteBatch,
}

impl StorageWriteBatch for RocksDBWriteBatch {
    fn put_batch(&mut self, table: Table, batch: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Error> {
        let cf = self
            .db
            .cf_handle(cf_name(table))
            .ok_or_else(|| format!("Column family {} not found", cf_name(table)))?;

        for (key, value) in batch {
            self.batch.put_cf(&cf, key, value);
        }
        Ok(())
    }

    fn delete_batch(&mut self, table: Table, keys: Vec<Vec<u8>>) -> Result<(), Error> {
        let cf = self
            .db
            .cf_handle(cf_name(table))
            .ok_or_else(|| format!("Column family {} not found", cf_name(table)))?;

        for key in keys {
            self.batch.delete_cf(&cf, key);
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        // A protection record must be durable before the next signing request
        // for the key is evaluated, so sync the WAL on every commit.
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);

        self.db.write_opt(self.batch, &write_opts)?;
        Ok(())
    }
}
