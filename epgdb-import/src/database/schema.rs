//! Database schema definitions.
//!
//! Table, index and trigger definitions must match what the native EPG
//! cache engine creates itself, since it reloads the file after import.

/// SQL schema for an empty epg.db.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE T_Service (id INTEGER PRIMARY KEY, sid INTEGER NOT NULL, tsid INTEGER, onid INTEGER, dvbnamespace INTEGER, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Source (id INTEGER PRIMARY KEY, source_name TEXT NOT NULL, priority INTEGER NOT NULL, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Title (id INTEGER PRIMARY KEY, hash INTEGER NOT NULL UNIQUE, title TEXT NOT NULL, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Short_Description (id INTEGER PRIMARY KEY, hash INTEGER NOT NULL UNIQUE, short_description TEXT NOT NULL, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Extended_Description (id INTEGER PRIMARY KEY, hash INTEGER NOT NULL UNIQUE, extended_description TEXT NOT NULL, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Event (id INTEGER PRIMARY KEY, service_id INTEGER NOT NULL, begin_time INTEGER NOT NULL, duration INTEGER NOT NULL, source_id INTEGER NOT NULL, dvb_event_id INTEGER, changed DATETIME NOT NULL DEFAULT current_timestamp);
CREATE TABLE T_Data (event_id INTEGER NOT NULL, title_id INTEGER, short_description_id INTEGER, extended_description_id INTEGER, iso_639_language_code TEXT NOT NULL, changed DATETIME NOT NULL DEFAULT current_timestamp);

CREATE INDEX data_title ON T_Data (title_id);
CREATE INDEX data_shortdescr ON T_Data (short_description_id);
CREATE INDEX data_extdescr ON T_Data (extended_description_id);
CREATE INDEX service_sid ON T_Service (sid);
CREATE INDEX event_service_id_begin_time ON T_Event (service_id, begin_time);
CREATE INDEX event_dvb_id ON T_Event (dvb_event_id);
CREATE INDEX data_event_id ON T_Data (event_id);

CREATE TRIGGER tr_on_delete_cascade_t_event AFTER DELETE ON T_Event FOR EACH ROW BEGIN DELETE FROM T_Data WHERE event_id = OLD.id; END;
CREATE TRIGGER tr_on_delete_cascade_t_service_t_event AFTER DELETE ON T_Service FOR EACH ROW BEGIN DELETE FROM T_Event WHERE service_id = OLD.id; END;
CREATE TRIGGER tr_on_delete_cascade_t_data_t_title AFTER DELETE ON T_Data FOR EACH ROW WHEN ((SELECT event_id FROM T_Data WHERE title_id = OLD.title_id LIMIT 1) ISNULL) BEGIN DELETE FROM T_Title WHERE id = OLD.title_id; END;
CREATE TRIGGER tr_on_delete_cascade_t_data_t_short_description AFTER DELETE ON T_Data FOR EACH ROW WHEN ((SELECT event_id FROM T_Data WHERE short_description_id = OLD.short_description_id LIMIT 1) ISNULL) BEGIN DELETE FROM T_Short_Description WHERE id = OLD.short_description_id; END;
CREATE TRIGGER tr_on_delete_cascade_t_data_t_extended_description AFTER DELETE ON T_Data FOR EACH ROW WHEN ((SELECT event_id FROM T_Data WHERE extended_description_id = OLD.extended_description_id LIMIT 1) ISNULL) BEGIN DELETE FROM T_Extended_Description WHERE id = OLD.extended_description_id; END;
CREATE TRIGGER tr_on_update_cascade_t_data AFTER UPDATE ON T_Data FOR EACH ROW WHEN (OLD.title_id <> NEW.title_id AND ((SELECT event_id FROM T_Data WHERE title_id = OLD.title_id LIMIT 1) ISNULL)) BEGIN DELETE FROM T_Title WHERE id = OLD.title_id; END;
"#;

/// Well-known broadcast EPG sources the native engine expects at ids 0-4.
pub const DEFAULT_SOURCES: [(i64, &str); 5] = [
    (0, "Sky Private EPG"),
    (1, "DVB Now/Next Table"),
    (2, "DVB Schedule (same Transponder)"),
    (3, "DVB Schedule Other (other Transponder)"),
    (4, "Viasat"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        assert_eq!(
            names(&conn, "table"),
            vec![
                "T_Data",
                "T_Event",
                "T_Extended_Description",
                "T_Service",
                "T_Short_Description",
                "T_Source",
                "T_Title"
            ]
        );
        assert_eq!(names(&conn, "index").len(), 7);
        assert_eq!(names(&conn, "trigger").len(), 6);
    }

    #[test]
    fn test_event_delete_cascades_to_orphaned_texts() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO T_Title (id, hash, title) VALUES (1, 11, 'shared'), (2, 22, 'own');
            INSERT INTO T_Short_Description (id, hash, short_description) VALUES (1, 11, 'short');
            INSERT INTO T_Extended_Description (id, hash, extended_description) VALUES (1, 11, 'ext');
            INSERT INTO T_Event (id, service_id, begin_time, duration, source_id) VALUES (1, 1, 0, 60, 0), (2, 1, 60, 60, 0);
            INSERT INTO T_Data VALUES (1, 1, 1, 1, 'eng', current_timestamp);
            INSERT INTO T_Data VALUES (2, 2, 1, 1, 'eng', current_timestamp);
            "#,
        )
        .unwrap();

        conn.execute("DELETE FROM T_Event WHERE id = 2", []).unwrap();
        let titles: i64 = conn
            .query_row("SELECT COUNT(*) FROM T_Title", [], |row| row.get(0))
            .unwrap();
        assert_eq!(titles, 1);

        conn.execute("DELETE FROM T_Event WHERE id = 1", []).unwrap();
        for table in ["T_Data", "T_Title", "T_Short_Description", "T_Extended_Description"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{} not cleaned up", table);
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_service_delete_cascades_to_events() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO T_Service (id, sid, tsid, onid, dvbnamespace) VALUES (1, 10, 1, 1, 0), (2, 20, 1, 1, 0);
            INSERT INTO T_Title (id, hash, title) VALUES (1, 11, 'only on 1'), (2, 22, 'shared');
            INSERT INTO T_Short_Description (id, hash, short_description) VALUES (1, 11, 'short');
            INSERT INTO T_Extended_Description (id, hash, extended_description) VALUES (1, 11, 'ext');
            INSERT INTO T_Event (id, service_id, begin_time, duration, source_id) VALUES (1, 1, 0, 60, 0), (2, 1, 60, 60, 0), (3, 2, 0, 60, 0);
            INSERT INTO T_Data VALUES (1, 1, 1, 1, 'eng', current_timestamp);
            INSERT INTO T_Data VALUES (2, 2, 1, 1, 'eng', current_timestamp);
            INSERT INTO T_Data VALUES (3, 2, 1, 1, 'eng', current_timestamp);
            "#,
        )
        .unwrap();

        conn.execute("DELETE FROM T_Service WHERE id = 1", []).unwrap();

        assert_eq!(count(&conn, "T_Event"), 1);
        assert_eq!(count(&conn, "T_Data"), 1);
        // Title 1 lost its last reference; title 2 and the descriptions are
        // still used by service 2.
        let titles: Vec<String> = conn
            .prepare("SELECT title FROM T_Title")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(titles, vec!["shared"]);
        assert_eq!(count(&conn, "T_Short_Description"), 1);
        assert_eq!(count(&conn, "T_Extended_Description"), 1);
    }

    #[test]
    fn test_title_update_drops_orphaned_title() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO T_Title (id, hash, title) VALUES (1, 11, 'old'), (2, 22, 'new'), (3, 33, 'kept');
            INSERT INTO T_Event (id, service_id, begin_time, duration, source_id) VALUES (1, 1, 0, 60, 0), (2, 1, 60, 60, 0), (3, 1, 120, 60, 0);
            INSERT INTO T_Data VALUES (1, 1, NULL, NULL, 'eng', current_timestamp);
            INSERT INTO T_Data VALUES (2, 3, NULL, NULL, 'eng', current_timestamp);
            INSERT INTO T_Data VALUES (3, 3, NULL, NULL, 'eng', current_timestamp);
            "#,
        )
        .unwrap();

        conn.execute("UPDATE T_Data SET title_id = 2 WHERE event_id = 1", [])
            .unwrap();
        let old: i64 = conn
            .query_row("SELECT COUNT(*) FROM T_Title WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(old, 0);

        // Title 3 is still referenced by event 3.
        conn.execute("UPDATE T_Data SET title_id = 2 WHERE event_id = 2", [])
            .unwrap();
        assert_eq!(count(&conn, "T_Title"), 2);
    }
}
