//! Service (channel identity) rows.

use super::{EpgDatabase, Result, ServiceRecord};
use epgdb_types::ServiceRef;
use rusqlite::params;

impl EpgDatabase {
    /// Get the `T_Service` id for a service, creating the row if needed.
    ///
    /// The lookup uses the normalized namespace, so DVB-T references that
    /// only differ in the low namespace bits share one row.
    pub fn get_or_create_service(&self, service: &ServiceRef) -> Result<i64> {
        let sid = i64::from(service.sid);
        let tsid = i64::from(service.tsid);
        let onid = i64::from(service.onid);
        let namespace = service.dvb_namespace();

        let result = self
            .conn
            .prepare_cached(
                "SELECT id FROM T_Service WHERE sid = ?1 AND tsid = ?2 AND onid = ?3 AND dvbnamespace = ?4",
            )?
            .query_row(params![sid, tsid, onid, namespace], |row| row.get(0));

        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO T_Service (sid, tsid, onid, dvbnamespace) VALUES (?1, ?2, ?3, ?4)",
                    )?
                    .execute(params![sid, tsid, onid, namespace])?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a service row by id.
    pub fn get_service(&self, id: i64) -> Result<Option<ServiceRecord>> {
        let result = self.conn.query_row(
            "SELECT id, sid, tsid, onid, dvbnamespace FROM T_Service WHERE id = ?1",
            [id],
            |row| {
                Ok(ServiceRecord {
                    id: row.get(0)?,
                    sid: row.get(1)?,
                    tsid: row.get(2)?,
                    onid: row.get(3)?,
                    dvbnamespace: row.get(4)?,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_created_once() {
        let db = EpgDatabase::open_in_memory().unwrap();
        let service = ServiceRef::parse("1:0:19:2B66:3F3:1:C00000:0:0:0:").unwrap();

        let id = db.get_or_create_service(&service).unwrap();
        assert_eq!(db.get_or_create_service(&service).unwrap(), id);
        assert_eq!(db.table_counts().unwrap().services, 1);

        let record = db.get_service(id).unwrap().unwrap();
        assert_eq!(record.sid, 0x2B66);
        assert_eq!(record.tsid, 0x3F3);
        assert_eq!(record.onid, 1);
        assert_eq!(record.dvbnamespace, 0xC00000);
    }

    #[test]
    fn test_dvbt_namespaces_share_service() {
        let db = EpgDatabase::open_in_memory().unwrap();
        let a = ServiceRef::parse("1:0:1:445D:453:1:EEEE0A3B:0:0:0:").unwrap();
        let b = ServiceRef::parse("1:0:1:445D:453:1:EEEE1234:0:0:0:").unwrap();

        let id_a = db.get_or_create_service(&a).unwrap();
        let id_b = db.get_or_create_service(&b).unwrap();
        assert_eq!(id_a, id_b);

        let record = db.get_service(id_a).unwrap().unwrap();
        assert_eq!(record.dvbnamespace, 4_008_574_976 - 4_294_967_296);
    }
}
