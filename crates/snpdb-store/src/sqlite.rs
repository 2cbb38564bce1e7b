// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use snpdb_core::sha256_hex;
use snpdb_model::{
    Attributes, FileFilter, FileId, FileMeta, GenotypeBlock, Individual, IndividualFilter,
    IndividualId, MapDoc, MapFilter, MapMarkerChunk, MapName, Marker, MarkerFilter, MarkerId,
    Sample, SampleFilter, SampleKey, COUNTER_DOMAINS, COUNTER_FILES,
};
use tracing::debug;

use crate::{BlobStore, DocumentStore, StoreError, StoreErrorCode};

pub const SQLITE_SCHEMA_VERSION: i64 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS counters (
      domain TEXT PRIMARY KEY,
      next INTEGER NOT NULL
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS markers (
      id INTEGER PRIMARY KEY,
      name TEXT,
      chromosome TEXT,
      position INTEGER,
      extra TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_markers_locus ON markers(chromosome, position);
    CREATE INDEX IF NOT EXISTS idx_markers_name ON markers(name);
    CREATE TABLE IF NOT EXISTS marker_maps (
      marker_id INTEGER NOT NULL,
      map TEXT NOT NULL,
      UNIQUE (marker_id, map)
    );
    CREATE INDEX IF NOT EXISTS idx_marker_maps_map ON marker_maps(map);
    CREATE TABLE IF NOT EXISTS maps (
      name TEXT PRIMARY KEY,
      format TEXT NOT NULL,
      marker_count INTEGER NOT NULL,
      doc TEXT NOT NULL
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS map_chunks (
      map TEXT NOT NULL,
      chunk_index INTEGER NOT NULL,
      doc TEXT NOT NULL,
      PRIMARY KEY (map, chunk_index)
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS samples (
      map TEXT NOT NULL,
      sample_id TEXT NOT NULL,
      doc TEXT NOT NULL,
      PRIMARY KEY (map, sample_id)
    ) WITHOUT ROWID;
    CREATE INDEX IF NOT EXISTS idx_samples_sample_id ON samples(sample_id);
    CREATE TABLE IF NOT EXISTS genotype_blocks (
      map TEXT NOT NULL,
      sample_id TEXT NOT NULL,
      block_number INTEGER NOT NULL,
      doc TEXT NOT NULL,
      PRIMARY KEY (map, sample_id, block_number)
    ) WITHOUT ROWID;
    CREATE TABLE IF NOT EXISTS individuals (
      id INTEGER PRIMARY KEY
    );
    CREATE TABLE IF NOT EXISTS individual_tatoos (
      individual_id INTEGER NOT NULL,
      tatoo TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_individual_tatoos_tatoo ON individual_tatoos(tatoo);
    CREATE INDEX IF NOT EXISTS idx_individual_tatoos_owner ON individual_tatoos(individual_id);
    CREATE TABLE IF NOT EXISTS individual_samples (
      individual_id INTEGER NOT NULL,
      map TEXT NOT NULL,
      sample_id TEXT NOT NULL,
      UNIQUE (map, sample_id)
    );
    CREATE INDEX IF NOT EXISTS idx_individual_samples_owner ON individual_samples(individual_id);
    CREATE TABLE IF NOT EXISTS files (
      id INTEGER PRIMARY KEY,
      filename TEXT NOT NULL,
      individual TEXT,
      length INTEGER NOT NULL,
      sha256 TEXT NOT NULL,
      attributes TEXT NOT NULL,
      content BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_files_individual ON files(individual);
";

const MARKER_COLUMNS: &str = "m.id, m.name, m.chromosome, m.position, m.extra, \
    (SELECT json_group_array(mm.map) FROM \
       (SELECT map FROM marker_maps WHERE marker_id = m.id ORDER BY rowid) AS mm)";

const INDIVIDUAL_COLUMNS: &str = "i.id, \
    (SELECT json_group_array(t.tatoo) FROM \
       (SELECT tatoo FROM individual_tatoos WHERE individual_id = i.id ORDER BY rowid) AS t), \
    (SELECT json_group_array(json_object('map', s.map, 'sample_id', s.sample_id)) FROM \
       (SELECT map, sample_id FROM individual_samples WHERE individual_id = i.id ORDER BY rowid) AS s)";

/// Single-file backend. All collections live in one SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::new(
                    StoreErrorCode::Io,
                    format!("failed to create {}: {e}", parent.display()),
                )
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Io,
                format!("failed to open {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SQLITE_SCHEMA_VERSION {
            return Err(StoreError::new(
                StoreErrorCode::Unsupported,
                format!(
                    "database schema version {version} is newer than supported {SQLITE_SCHEMA_VERSION}"
                ),
            ));
        }
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(&format!("PRAGMA user_version={SQLITE_SCHEMA_VERSION};"))?;
        for domain in COUNTER_DOMAINS {
            conn.execute(
                "INSERT OR IGNORE INTO counters (domain, next) VALUES (?1, 0)",
                params![domain],
            )?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "sqlite connection mutex poisoned"))
    }
}

fn to_sql(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| {
        StoreError::new(
            StoreErrorCode::Validation,
            format!("{value} exceeds the sqlite integer range"),
        )
    })
}

fn from_sql(value: i64) -> rusqlite::Result<u64> {
    u64::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
    })
}

fn json_column<T: serde::de::DeserializeOwned>(raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn marker_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Marker> {
    let position: Option<i64> = row.get(3)?;
    let extra: String = row.get(4)?;
    let maps: String = row.get(5)?;
    Ok(Marker {
        id: MarkerId(from_sql(row.get(0)?)?),
        name: row.get(1)?,
        chromosome: row.get(2)?,
        position: position.map(from_sql).transpose()?,
        maps: json_column(&maps)?,
        extra: json_column(&extra)?,
    })
}

fn individual_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Individual> {
    let tatoos: String = row.get(1)?;
    let samples: String = row.get(2)?;
    Ok(Individual {
        id: IndividualId(from_sql(row.get(0)?)?),
        tatoos: json_column(&tatoos)?,
        samples: json_column(&samples)?,
    })
}

fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileMeta> {
    let attributes: String = row.get(5)?;
    Ok(FileMeta {
        id: FileId(from_sql(row.get(0)?)?),
        filename: row.get(1)?,
        individual: row.get(2)?,
        length: from_sql(row.get(3)?)?,
        sha256: row.get(4)?,
        attributes: json_column(&attributes)?,
    })
}

fn doc_column<T: serde::de::DeserializeOwned>(row: &rusqlite::Row<'_>) -> rusqlite::Result<T> {
    let raw: String = row.get(0)?;
    json_column(&raw)
}

/// Accumulates `AND`-joined predicates and their bound values.
#[derive(Default)]
struct WhereClause {
    predicates: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    fn push(&mut self, predicate: &'static str, value: SqlValue) {
        self.predicates.push(predicate);
        self.values.push(value);
    }

    fn render(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }
}

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn integer(value: u64) -> Result<SqlValue, StoreError> {
    Ok(SqlValue::Integer(to_sql(value)?))
}

impl DocumentStore for SqliteStore {
    fn increment_counter(&self, domain: &str, by: u64) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let previous: Option<i64> = tx
            .query_row(
                "SELECT next FROM counters WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .optional()?;
        let previous = previous
            .ok_or_else(|| StoreError::not_found(format!("counter `{domain}` is not provisioned")))?;
        let next = previous.checked_add(to_sql(by)?).ok_or_else(|| {
            StoreError::new(StoreErrorCode::Internal, format!("counter `{domain}` overflow"))
        })?;
        tx.execute(
            "UPDATE counters SET next = ?1 WHERE domain = ?2",
            params![next, domain],
        )?;
        tx.commit()?;
        Ok(from_sql(previous)?)
    }

    fn insert_markers(&self, markers: &[Marker]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO markers (id, name, chromosome, position, extra) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut membership =
                tx.prepare("INSERT OR IGNORE INTO marker_maps (marker_id, map) VALUES (?1, ?2)")?;
            for marker in markers {
                let id = to_sql(marker.id.get())?;
                let position = marker.position.map(to_sql).transpose()?;
                stmt.execute(params![
                    id,
                    marker.name,
                    marker.chromosome,
                    position,
                    serde_json::to_string(&marker.extra)?
                ])
                .map_err(|e| match StoreError::from(e) {
                    err if err.code == StoreErrorCode::Conflict => {
                        StoreError::conflict(format!("marker {} already exists", marker.id))
                    }
                    err => err,
                })?;
                for map in &marker.maps {
                    membership.execute(params![id, map.as_str()])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_markers(&self, filter: &MarkerFilter) -> Result<Vec<Marker>, StoreError> {
        let mut clause = WhereClause::default();
        if let Some(id) = filter.id {
            clause.push("m.id = ?", integer(id.get())?);
        }
        if let Some(name) = &filter.name {
            clause.push("m.name = ?", text(name));
        }
        if let Some(chromosome) = &filter.chromosome {
            clause.push("m.chromosome = ?", text(chromosome));
        }
        if let Some(min) = filter.min_position {
            clause.push("m.position >= ?", integer(min)?);
        }
        if let Some(max) = filter.max_position {
            clause.push("m.position <= ?", integer(max)?);
        }
        if let Some(map) = &filter.map {
            clause.push(
                "EXISTS (SELECT 1 FROM marker_maps x WHERE x.marker_id = m.id AND x.map = ?)",
                text(map.as_str()),
            );
        }
        let sql = format!(
            "SELECT {MARKER_COLUMNS} FROM markers m{} ORDER BY m.id",
            clause.render()
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), marker_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            let marker = row?;
            // Chromosome ranges need numeric-aware ordering, which SQL collation lacks.
            if filter.matches(&marker) {
                out.push(marker);
            }
        }
        Ok(out)
    }

    fn append_marker_map(&self, ids: &[MarkerId], map: &MapName) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut matched = 0;
        {
            let mut exists = tx.prepare("SELECT 1 FROM markers WHERE id = ?1")?;
            let mut insert =
                tx.prepare("INSERT OR IGNORE INTO marker_maps (marker_id, map) VALUES (?1, ?2)")?;
            for id in ids {
                let id = to_sql(id.get())?;
                if exists.exists(params![id])? {
                    insert.execute(params![id, map.as_str()])?;
                    matched += 1;
                }
            }
        }
        tx.commit()?;
        Ok(matched)
    }

    fn insert_map(&self, map: &MapDoc) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO maps (name, format, marker_count, doc) VALUES (?1, ?2, ?3, ?4)",
            params![
                map.name.as_str(),
                map.format,
                to_sql(map.marker_count)?,
                serde_json::to_string(map)?
            ],
        )
        .map_err(|e| match StoreError::from(e) {
            err if err.code == StoreErrorCode::Conflict => {
                StoreError::conflict(format!("map `{}` already exists", map.name))
            }
            err => err,
        })?;
        Ok(())
    }

    fn find_maps(&self, filter: &MapFilter) -> Result<Vec<MapDoc>, StoreError> {
        let mut clause = WhereClause::default();
        if let Some(name) = &filter.name {
            clause.push("name = ?", text(name.as_str()));
        }
        if let Some(format) = &filter.format {
            clause.push("format = ?", text(format));
        }
        if let Some(min) = filter.min_size {
            clause.push("marker_count >= ?", integer(min)?);
        }
        if let Some(max) = filter.max_size {
            clause.push("marker_count <= ?", integer(max)?);
        }
        let sql = format!("SELECT doc FROM maps{} ORDER BY name", clause.render());
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), doc_column)?;
        Ok(rows.collect::<rusqlite::Result<Vec<MapDoc>>>()?)
    }

    fn insert_chunks(&self, chunks: &[MapMarkerChunk]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO map_chunks (map, chunk_index, doc) VALUES (?1, ?2, ?3)")?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.map.as_str(),
                    to_sql(chunk.chunk_index)?,
                    serde_json::to_string(chunk)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_chunk(
        &self,
        map: &MapName,
        chunk_index: u64,
    ) -> Result<Option<MapMarkerChunk>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT doc FROM map_chunks WHERE map = ?1 AND chunk_index = ?2",
                params![map.as_str(), to_sql(chunk_index)?],
                doc_column,
            )
            .optional()?)
    }

    fn find_chunks(&self, map: &MapName) -> Result<Vec<MapMarkerChunk>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT doc FROM map_chunks WHERE map = ?1 ORDER BY chunk_index")?;
        let rows = stmt.query_map(params![map.as_str()], doc_column)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_sample(&self, sample: &Sample) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO samples (map, sample_id, doc) VALUES (?1, ?2, ?3)",
            params![
                sample.map.as_str(),
                sample.sample_id,
                serde_json::to_string(sample)?
            ],
        )
        .map_err(|e| match StoreError::from(e) {
            err if err.code == StoreErrorCode::Conflict => {
                StoreError::conflict(format!("sample `{}` already exists", sample.key()))
            }
            err => err,
        })?;
        Ok(())
    }

    fn find_samples(&self, filter: &SampleFilter) -> Result<Vec<Sample>, StoreError> {
        let mut clause = WhereClause::default();
        if let Some(sample_id) = &filter.sample_id {
            clause.push("sample_id = ?", text(sample_id));
        }
        if let Some(map) = &filter.map {
            clause.push("map = ?", text(map.as_str()));
        }
        let sql = format!(
            "SELECT doc FROM samples{} ORDER BY map, sample_id",
            clause.render()
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), doc_column)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_samples(&self, keys: &[SampleKey]) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM samples WHERE map = ?1 AND sample_id = ?2")?;
            for key in keys {
                deleted += stmt.execute(params![key.map.as_str(), key.sample_id])? as u64;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn insert_blocks(&self, blocks: &[GenotypeBlock]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO genotype_blocks (map, sample_id, block_number, doc) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for block in blocks {
                stmt.execute(params![
                    block.map.as_str(),
                    block.sample_id,
                    to_sql(block.block_number)?,
                    serde_json::to_string(block)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_block(
        &self,
        key: &SampleKey,
        block_number: u64,
    ) -> Result<Option<GenotypeBlock>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT doc FROM genotype_blocks WHERE map = ?1 AND sample_id = ?2 AND block_number = ?3",
                params![key.map.as_str(), key.sample_id, to_sql(block_number)?],
                doc_column,
            )
            .optional()?)
    }

    fn find_blocks(&self, key: &SampleKey) -> Result<Vec<GenotypeBlock>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT doc FROM genotype_blocks WHERE map = ?1 AND sample_id = ?2 ORDER BY block_number",
        )?;
        let rows = stmt.query_map(params![key.map.as_str(), key.sample_id], doc_column)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_blocks(&self, keys: &[SampleKey]) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt =
                tx.prepare("DELETE FROM genotype_blocks WHERE map = ?1 AND sample_id = ?2")?;
            for key in keys {
                deleted += stmt.execute(params![key.map.as_str(), key.sample_id])? as u64;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn insert_individual(&self, individual: &Individual) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = to_sql(individual.id.get())?;
        tx.execute("INSERT INTO individuals (id) VALUES (?1)", params![id])
            .map_err(|e| match StoreError::from(e) {
                err if err.code == StoreErrorCode::Conflict => {
                    StoreError::conflict(format!("individual {} already exists", individual.id))
                }
                err => err,
            })?;
        {
            let mut tatoo =
                tx.prepare("INSERT INTO individual_tatoos (individual_id, tatoo) VALUES (?1, ?2)")?;
            for t in &individual.tatoos {
                tatoo.execute(params![id, t])?;
            }
            let mut sample = tx.prepare(
                "INSERT INTO individual_samples (individual_id, map, sample_id) VALUES (?1, ?2, ?3)",
            )?;
            for key in &individual.samples {
                sample
                    .execute(params![id, key.map.as_str(), key.sample_id])
                    .map_err(|e| match StoreError::from(e) {
                        err if err.code == StoreErrorCode::Conflict => StoreError::conflict(
                            format!("sample `{key}` already belongs to an individual"),
                        ),
                        err => err,
                    })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_individuals(&self, filter: &IndividualFilter) -> Result<Vec<Individual>, StoreError> {
        let mut clause = WhereClause::default();
        if let Some(id) = filter.id {
            clause.push("i.id = ?", integer(id.get())?);
        }
        if let Some(tatoo) = &filter.tatoo {
            clause.push(
                "EXISTS (SELECT 1 FROM individual_tatoos x WHERE x.individual_id = i.id AND x.tatoo = ?)",
                text(tatoo),
            );
        }
        if let Some(map) = &filter.sample_map {
            clause.push(
                "EXISTS (SELECT 1 FROM individual_samples x WHERE x.individual_id = i.id AND x.map = ?)",
                text(map.as_str()),
            );
        }
        if let Some(sample_id) = &filter.sample_id {
            clause.push(
                "EXISTS (SELECT 1 FROM individual_samples x WHERE x.individual_id = i.id AND x.sample_id = ?)",
                text(sample_id),
            );
        }
        let sql = format!(
            "SELECT {INDIVIDUAL_COLUMNS} FROM individuals i{} ORDER BY i.id",
            clause.render()
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), individual_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn append_individual_sample(
        &self,
        id: IndividualId,
        key: &SampleKey,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let sql_id = to_sql(id.get())?;
        if !tx
            .prepare("SELECT 1 FROM individuals WHERE id = ?1")?
            .exists(params![sql_id])?
        {
            return Err(StoreError::not_found(format!("individual {id} not found")));
        }
        let owner: Option<i64> = tx
            .query_row(
                "SELECT individual_id FROM individual_samples WHERE map = ?1 AND sample_id = ?2",
                params![key.map.as_str(), key.sample_id],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            Some(owner) if owner == sql_id => return Ok(()),
            Some(owner) => {
                return Err(StoreError::conflict(format!(
                    "sample `{key}` already belongs to individual {owner}"
                )))
            }
            None => {}
        }
        tx.execute(
            "INSERT INTO individual_samples (individual_id, map, sample_id) VALUES (?1, ?2, ?3)",
            params![sql_id, key.map.as_str(), key.sample_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_individual(&self, id: IndividualId) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let sql_id = to_sql(id.get())?;
        tx.execute(
            "DELETE FROM individual_samples WHERE individual_id = ?1",
            params![sql_id],
        )?;
        tx.execute(
            "DELETE FROM individual_tatoos WHERE individual_id = ?1",
            params![sql_id],
        )?;
        let deleted = tx.execute("DELETE FROM individuals WHERE id = ?1", params![sql_id])?;
        tx.commit()?;
        Ok(deleted as u64)
    }
}

impl BlobStore for SqliteStore {
    fn put_file(
        &self,
        bytes: &[u8],
        filename: &str,
        individual: Option<&str>,
        attributes: Attributes,
    ) -> Result<FileId, StoreError> {
        let id = FileId(self.increment_counter(COUNTER_FILES, 1)?);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (id, filename, individual, length, sha256, attributes, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                to_sql(id.get())?,
                filename,
                individual,
                to_sql(bytes.len() as u64)?,
                sha256_hex(bytes),
                serde_json::to_string(&attributes)?,
                bytes
            ],
        )?;
        Ok(id)
    }

    fn get_file(&self, id: FileId) -> Result<(FileMeta, Vec<u8>), StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, filename, individual, length, sha256, attributes, content FROM files WHERE id = ?1",
            params![to_sql(id.get())?],
            |row| Ok((file_from_row(row)?, row.get::<_, Vec<u8>>(6)?)),
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found(format!("file {id} not found")))
    }

    fn list_files(&self, filter: &FileFilter) -> Result<Vec<FileMeta>, StoreError> {
        let mut clause = WhereClause::default();
        if let Some(individual) = &filter.individual {
            clause.push("individual = ?", text(individual));
        }
        if let Some(name) = &filter.name {
            clause.push("filename = ?", text(name));
        }
        let sql = format!(
            "SELECT id, filename, individual, length, sha256, attributes FROM files{} ORDER BY id",
            clause.render()
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.values.iter()), file_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snpdb_model::{MarkerRecord, COUNTER_INDIVIDUALS};

    #[test]
    fn reopening_keeps_counters_and_schema_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("db.sqlite");
        {
            let store = SqliteStore::open(&path).expect("open");
            assert_eq!(store.increment_counter(COUNTER_INDIVIDUALS, 4).expect("inc"), 0);
        }
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.increment_counter(COUNTER_INDIVIDUALS, 1).expect("inc"), 4);
        let conn = store.lock().expect("lock");
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .expect("version");
        assert_eq!(version, SQLITE_SCHEMA_VERSION);
    }

    #[test]
    fn marker_maps_keep_append_order() {
        let store = SqliteStore::open_in_memory().expect("open");
        let marker = Marker::from_record(
            MarkerId(0),
            MarkerRecord::new(Some("rs1"), Some("1"), Some(100)),
        );
        store.insert_markers(&[marker]).expect("insert");
        let m2 = MapName::parse("M2").expect("name");
        let m1 = MapName::parse("M1").expect("name");
        store.append_marker_map(&[MarkerId(0)], &m2).expect("append");
        store.append_marker_map(&[MarkerId(0)], &m1).expect("append");
        store.append_marker_map(&[MarkerId(0)], &m2).expect("append");
        let found = store.find_markers(&MarkerFilter::default()).expect("find");
        assert_eq!(found[0].maps, vec![m2, m1]);
    }
}
