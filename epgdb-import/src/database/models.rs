//! Database model definitions.

use serde::Serialize;

/// `T_Source` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub id: i64,
    pub source_name: String,
    pub priority: i64,
}

/// `T_Service` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub sid: i64,
    pub tsid: i64,
    pub onid: i64,
    pub dvbnamespace: i64,
}

/// Values for a new `T_Event` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEvent {
    pub service_id: i64,
    pub begin_time: i64,
    pub duration: i64,
    pub source_id: i64,
    pub dvb_event_id: i64,
}

/// Values for a new `T_Data` row linking an event to its texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewData<'a> {
    pub event_id: i64,
    pub title_id: i64,
    pub short_description_id: i64,
    pub extended_description_id: i64,
    pub language: &'a str,
}

/// The three hash-deduplicated text tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextTable {
    Title,
    ShortDescription,
    ExtendedDescription,
}

impl TextTable {
    pub fn table_name(self) -> &'static str {
        match self {
            TextTable::Title => "T_Title",
            TextTable::ShortDescription => "T_Short_Description",
            TextTable::ExtendedDescription => "T_Extended_Description",
        }
    }

    pub fn text_column(self) -> &'static str {
        match self {
            TextTable::Title => "title",
            TextTable::ShortDescription => "short_description",
            TextTable::ExtendedDescription => "extended_description",
        }
    }
}

/// Row counts of the import-relevant tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub sources: i64,
    pub services: i64,
    pub events: i64,
    pub data: i64,
    pub titles: i64,
    pub short_descriptions: i64,
    pub extended_descriptions: i64,
}
