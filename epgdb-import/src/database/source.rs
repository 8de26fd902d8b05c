//! EPG source (provider/priority) rows.

use super::{EpgDatabase, Result, SourceRecord};
use rusqlite::params;

impl EpgDatabase {
    /// Look up a source by name and priority.
    pub fn find_source(&self, name: &str, priority: i64) -> Result<Option<i64>> {
        let result = self.conn.query_row(
            "SELECT id FROM T_Source WHERE source_name = ?1 AND priority = ?2",
            params![name, priority],
            |row| row.get(0),
        );

        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the id of a source, creating the row if it doesn't exist.
    pub fn get_or_create_source(&self, name: &str, priority: i64) -> Result<i64> {
        if let Some(id) = self.find_source(name, priority)? {
            log::info!("Found {} EPG with source_id {}", name, id);
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO T_Source (source_name, priority) VALUES (?1, ?2)",
            params![name, priority],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Added {} EPG with source_id {}", name, id);
        Ok(id)
    }

    /// All sources ordered by id.
    pub fn list_sources(&self) -> Result<Vec<SourceRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, source_name, priority FROM T_Source ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(SourceRecord {
                    id: row.get(0)?,
                    source_name: row.get(1)?,
                    priority: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_source() {
        let db = EpgDatabase::open_in_memory().unwrap();

        let id = db.get_or_create_source("Rytec XMLTV", 99).unwrap();
        assert!(id >= 5);
        assert_eq!(db.get_or_create_source("Rytec XMLTV", 99).unwrap(), id);

        // Same name, different priority is a different source.
        let other = db.get_or_create_source("Rytec XMLTV", 10).unwrap();
        assert_ne!(other, id);
        assert_eq!(db.list_sources().unwrap().len(), 7);
    }

    #[test]
    fn test_seeded_source_is_found() {
        let db = EpgDatabase::open_in_memory().unwrap();
        assert_eq!(db.find_source("Viasat", 0).unwrap(), Some(4));
        assert_eq!(db.find_source("Viasat", 1).unwrap(), None);
    }
}
