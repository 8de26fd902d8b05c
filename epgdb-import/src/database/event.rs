//! Event, text and cross-reference rows.

use super::{EpgDatabase, NewData, NewEvent, Result, TextTable};
use rusqlite::params;

impl EpgDatabase {
    /// Delete all events of a service, whichever source wrote them.
    ///
    /// The `T_Data` rows and orphaned texts go with them via triggers.
    pub fn delete_service_events(&self, service_id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM T_Event WHERE service_id = ?1")?
            .execute([service_id])?;
        Ok(deleted)
    }

    /// Insert an event row and return its id.
    pub fn insert_event(&self, event: &NewEvent) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO T_Event (service_id, begin_time, duration, source_id, dvb_event_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                event.service_id,
                event.begin_time,
                event.duration,
                event.source_id,
                event.dvb_event_id
            ])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get the id of the text row with `hash`, inserting `text` if the hash is new.
    ///
    /// Rows are keyed by hash alone: the first text stored for a hash wins.
    pub fn get_or_insert_text(&self, table: TextTable, hash: i32, text: &str) -> Result<i64> {
        let select = format!("SELECT id FROM {} WHERE hash = ?1", table.table_name());
        let result = self
            .conn
            .prepare_cached(&select)?
            .query_row([hash], |row| row.get(0));

        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let insert = format!(
                    "INSERT INTO {} (hash, {}) VALUES (?1, ?2)",
                    table.table_name(),
                    table.text_column()
                );
                self.conn
                    .prepare_cached(&insert)?
                    .execute(params![hash, text])?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert the `T_Data` row tying an event to its texts.
    pub fn insert_data(&self, data: &NewData<'_>) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO T_Data (event_id, title_id, short_description_id, extended_description_id, iso_639_language_code)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                data.event_id,
                data.title_id,
                data.short_description_id,
                data.extended_description_id,
                data.language
            ])?;
        Ok(())
    }

    /// Number of events stored for a service.
    pub fn count_service_events(&self, service_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM T_Event WHERE service_id = ?1",
            [service_id],
            |row| row.get(0),
        )?)
    }

    /// Text stored under `hash`, if any.
    pub fn get_text(&self, table: TextTable, hash: i32) -> Result<Option<String>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE hash = ?1",
            table.text_column(),
            table.table_name()
        );
        let result = self.conn.query_row(&sql, [hash], |row| row.get(0));

        match result {
            Ok(text) => Ok(Some(text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_full_event(db: &EpgDatabase, service_id: i64, begin: i64, title_hash: i32) -> i64 {
        let event_id = db
            .insert_event(&NewEvent {
                service_id,
                begin_time: begin,
                duration: 60,
                source_id: 1,
                dvb_event_id: 0,
            })
            .unwrap();
        let title_id = db
            .get_or_insert_text(TextTable::Title, title_hash, "title")
            .unwrap();
        let short_id = db
            .get_or_insert_text(TextTable::ShortDescription, 7, "short")
            .unwrap();
        let ext_id = db
            .get_or_insert_text(TextTable::ExtendedDescription, 8, "ext")
            .unwrap();
        db.insert_data(&NewData {
            event_id,
            title_id,
            short_description_id: short_id,
            extended_description_id: ext_id,
            language: "eng",
        })
        .unwrap();
        event_id
    }

    #[test]
    fn test_text_rows_deduplicated_by_hash() {
        let db = EpgDatabase::open_in_memory().unwrap();

        let a = db.get_or_insert_text(TextTable::Title, -5, "News").unwrap();
        let b = db.get_or_insert_text(TextTable::Title, -5, "News").unwrap();
        let c = db.get_or_insert_text(TextTable::Title, 6, "Weather").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(db.table_counts().unwrap().titles, 2);
        assert_eq!(
            db.get_text(TextTable::Title, -5).unwrap().as_deref(),
            Some("News")
        );
    }

    #[test]
    fn test_delete_service_events_cascades() {
        let db = EpgDatabase::open_in_memory().unwrap();
        insert_full_event(&db, 1, 0, 1);
        insert_full_event(&db, 1, 60, 2);
        insert_full_event(&db, 2, 0, 1);

        assert_eq!(db.delete_service_events(1).unwrap(), 2);

        let counts = db.table_counts().unwrap();
        assert_eq!(counts.events, 1);
        assert_eq!(counts.data, 1);
        // Title 2 lost its last reference, title 1 is still used by service 2.
        assert_eq!(counts.titles, 1);
        assert_eq!(counts.short_descriptions, 1);
        assert_eq!(db.count_service_events(2).unwrap(), 1);
    }
}
