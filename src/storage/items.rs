use crate::crawl::model::ListingItem;
use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed sink for decoded listing items.
pub struct ItemStore {
    conn: Connection,
}

impl ItemStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT NOT NULL PRIMARY KEY,
                post_id TEXT,
                item_date TEXT,
                text TEXT,
                media TEXT
            )",
            [],
        )?;
        Ok(())
    }

    /// Inserts a batch of items inside one transaction.
    ///
    /// Rows whose id already exists are skipped, so re-running a crawl over
    /// pages seen before does not fail the batch. Returns the number of rows
    /// actually inserted.
    pub fn insert_items(&mut self, items: &[ListingItem]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO items (id, post_id, item_date, text, media)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for item in items {
                inserted += stmt.execute((
                    &item.id,
                    &item.post_id,
                    &item.date,
                    &item.text,
                    &item.joined_media(),
                ))?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Total number of stored items.
    pub fn count_items(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, media: &[&str]) -> ListingItem {
        ListingItem {
            id: id.to_string(),
            post_id: format!("post-{}", id),
            date: "2018-08-22 08:17:15".to_string(),
            text: "free text".to_string(),
            media: media.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_insert_batch() {
        let mut store = ItemStore::open_in_memory().unwrap();
        let items = vec![
            item("1", &["http://img.example.com/a.jpg"]),
            item("2", &["http://img.example.com/b.jpg", "http://img.example.com/c.jpg"]),
        ];
        assert_eq!(store.insert_items(&items).unwrap(), 2);
        assert_eq!(store.count_items().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_ids_do_not_fail_batch() {
        let mut store = ItemStore::open_in_memory().unwrap();
        store.insert_items(&[item("1", &[])]).unwrap();

        // Re-running the same page plus one new item inserts only the new row.
        let inserted = store
            .insert_items(&[item("1", &[]), item("2", &[])])
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.count_items().unwrap(), 2);
    }

    #[test]
    fn test_media_urls_stored_joined() {
        let mut store = ItemStore::open_in_memory().unwrap();
        store
            .insert_items(&[item("1", &["http://a/1.jpg", "http://a/2.jpg"])])
            .unwrap();

        let media: String = store
            .conn
            .query_row("SELECT media FROM items WHERE id = '1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(media, "http://a/1.jpg;http://a/2.jpg");
    }
}
