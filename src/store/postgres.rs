use super::{
    Checkpoint, CheckpointStore, RecordStore,
    schema::{extracted_records, processing_checkpoint},
};
use crate::{
    config::Database,
    error::{IngestError, Result},
    record::ExtractedRecord,
};
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

/// Creates `extracted_records` and `processing_checkpoint` when missing.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Resolved connection parameters.
#[derive(Clone)]
pub struct DbSettings {
    pub host: String,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub port: u16,
    pub connect_timeout_seconds: u64,
}

impl DbSettings {
    /// Config defaults overridden by `DB_HOST`, `DB_NAME`, `DB_USER`,
    /// `DB_PASSWORD` and `DB_PORT`.
    pub fn from_env(cfg: &Database) -> Result<Self> {
        Self::from_lookup(cfg, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(cfg: &Database, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, fallback: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        let port = match lookup("DB_PORT").filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| IngestError::Config(format!("DB_PORT {raw:?}: {e}")))?,
            None => cfg.port,
        };

        let settings = Self {
            host: var("DB_HOST", &cfg.host),
            dbname: var("DB_NAME", &cfg.name),
            user: var("DB_USER", &cfg.user),
            password: lookup("DB_PASSWORD"),
            port,
            connect_timeout_seconds: cfg.connect_timeout_seconds,
        };

        if settings.dbname.is_empty() {
            return Err(IngestError::Config(
                "database name is not set (DB_NAME or database.name)".into(),
            ));
        }
        Ok(settings)
    }

    /// libpq keyword/value connection string.
    pub fn conninfo(&self) -> String {
        self.render(self.password.as_deref())
    }

    /// Connection string safe for logs.
    pub fn conninfo_masked(&self) -> String {
        self.render(self.password.as_ref().map(|_| "***"))
    }

    fn render(&self, password: Option<&str>) -> String {
        let mut parts = vec![
            format!("host={}", quote(&self.host)),
            format!("port={}", self.port),
            format!("dbname={}", quote(&self.dbname)),
        ];
        if !self.user.is_empty() {
            parts.push(format!("user={}", quote(&self.user)));
        }
        if let Some(password) = password {
            parts.push(format!("password={}", quote(password)));
        }
        if self.connect_timeout_seconds > 0 {
            parts.push(format!("connect_timeout={}", self.connect_timeout_seconds));
        }
        parts.join(" ")
    }
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.conninfo_masked())
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[derive(Insertable)]
#[diesel(table_name = extracted_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct NewExtractedRecord<'a> {
    patient_name: Option<&'a str>,
    date_of_birth: Option<&'a str>,
    gender: Option<&'a str>,
    mrn: Option<&'a str>,
    test_name: Option<&'a str>,
    test_device: Option<&'a str>,
    specimen_type: Option<&'a str>,
    collection_date: Option<&'a str>,
    tested_pathogen: Option<&'a str>,
    test_result: Option<&'a str>,
    reported_date: Option<&'a str>,
    source: &'a str,
    source_file: &'a str,
    source_sha256: Option<&'a str>,
}

impl<'a> From<&'a ExtractedRecord> for NewExtractedRecord<'a> {
    fn from(r: &'a ExtractedRecord) -> Self {
        let f = &r.fields;
        Self {
            patient_name: f.patient_name.as_deref(),
            date_of_birth: f.date_of_birth.as_deref(),
            gender: f.gender.as_deref(),
            mrn: f.mrn.as_deref(),
            test_name: f.test_name.as_deref(),
            test_device: f.test_device.as_deref(),
            specimen_type: f.specimen_type.as_deref(),
            collection_date: f.collection_date.as_deref(),
            tested_pathogen: f.tested_pathogen.as_deref(),
            test_result: f.test_result.as_deref(),
            reported_date: f.reported_date.as_deref(),
            source: r.source.as_str(),
            source_file: &r.source_file,
            source_sha256: r.source_sha256.as_deref(),
        }
    }
}

/// PostgreSQL-backed record and checkpoint store on a single connection.
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn connect(settings: &DbSettings) -> Result<Self> {
        info!("connecting to postgres: {}", settings.conninfo_masked());
        let conn = PgConnection::establish(&settings.conninfo())
            .map_err(|e| IngestError::DatabaseConnectionFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn migrate(&mut self) -> Result<()> {
        let applied = self
            .conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| IngestError::DatabaseConnectionFailed(format!("applying migrations: {e}")))?
            .len();
        debug!("applied {applied} pending migrations");
        Ok(())
    }
}

impl RecordStore for PgStore {
    fn insert(&mut self, record: &ExtractedRecord) -> Result<()> {
        let row = NewExtractedRecord::from(record);
        diesel::insert_into(extracted_records::table)
            .values(&row)
            .execute(&mut self.conn)
            .map_err(|e| IngestError::PersistenceWriteFailed(e.to_string()))?;
        Ok(())
    }

    fn contains_fingerprint(&mut self, sha256: &str) -> Result<bool> {
        diesel::select(exists(
            extracted_records::table.filter(extracted_records::source_sha256.eq(sha256)),
        ))
        .get_result::<bool>(&mut self.conn)
        .map_err(|e| IngestError::PersistenceReadFailed(e.to_string()))
    }
}

impl CheckpointStore for PgStore {
    fn load(&mut self) -> Result<Option<Checkpoint>> {
        let row = processing_checkpoint::table
            .select((
                processing_checkpoint::folder,
                processing_checkpoint::last_processed_file,
            ))
            .order(processing_checkpoint::id.desc())
            .first::<(Option<String>, Option<String>)>(&mut self.conn)
            .optional()
            .map_err(|e| IngestError::CheckpointFailed(e.to_string()))?;

        Ok(row.and_then(|(folder, last)| {
            last.map(|last_processed| Checkpoint {
                folder,
                last_processed,
            })
        }))
    }

    fn advance(&mut self, folder: &str, identifier: &str) -> Result<()> {
        self.conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(processing_checkpoint::table).execute(conn)?;
                diesel::insert_into(processing_checkpoint::table)
                    .values((
                        processing_checkpoint::folder.eq(folder),
                        processing_checkpoint::last_processed_file.eq(identifier),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .map_err(|e| IngestError::CheckpointFailed(e.to_string()))
    }

    fn reset(&mut self) -> Result<()> {
        diesel::delete(processing_checkpoint::table)
            .execute(&mut self.conn)
            .map_err(|e| IngestError::CheckpointFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(env: &[(&str, &str)]) -> Result<DbSettings> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DbSettings::from_lookup(&Database::default(), |k| env.get(k).cloned())
    }

    #[test]
    fn environment_overrides_config() {
        let s = settings(&[
            ("DB_HOST", "db.internal"),
            ("DB_NAME", "labs"),
            ("DB_USER", "ingest"),
            ("DB_PASSWORD", "s3cr'et"),
            ("DB_PORT", "6543"),
        ])
        .unwrap();
        assert_eq!(s.host, "db.internal");
        assert_eq!(s.port, 6543);
        assert_eq!(
            s.conninfo(),
            "host='db.internal' port=6543 dbname='labs' user='ingest' password='s3cr\\'et' connect_timeout=10"
        );
    }

    #[test]
    fn password_is_masked() {
        let s = settings(&[("DB_NAME", "labs"), ("DB_PASSWORD", "hunter2")]).unwrap();
        let masked = s.conninfo_masked();
        assert!(!masked.contains("hunter2"));
        assert!(masked.contains("password='***'"));
        assert!(!format!("{s:?}").contains("hunter2"));
    }

    #[test]
    fn port_defaults_and_validates() {
        assert_eq!(settings(&[("DB_NAME", "labs")]).unwrap().port, 5432);
        assert!(matches!(
            settings(&[("DB_NAME", "labs"), ("DB_PORT", "abc")]),
            Err(IngestError::Config(_))
        ));
    }

    #[test]
    fn missing_database_name_is_rejected() {
        assert!(matches!(settings(&[]), Err(IngestError::Config(_))));
    }
}
