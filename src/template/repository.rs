//! FM template repository: loading, indexing and deterministic selection

use std::collections::BTreeMap;
use std::path::Path;

use crate::connection::{DatabaseType, detect_database_type};

use super::error::{TemplateError, TemplateResult};
use super::types::FmTemplate;

const JDBC_SOURCE_CLASS: &str = "io.confluent.connect.jdbc.JdbcSourceConnector";
const JDBC_SINK_CLASS: &str = "io.confluent.connect.jdbc.JdbcSinkConnector";
const SFTP_CSV_SOURCE_CLASS: &str = "io.confluent.connect.sftp.SftpCsvSourceConnector";
const SNOWFLAKE_SOURCE_CLASS: &str = "io.confluent.connect.snowflake.jdbc.SnowflakeSourceConnector";
const SNOWFLAKE_SINK_CLASS: &str = "io.confluent.connect.snowflake.jdbc.SnowflakeSinkConnector";

/// Debezium connector class pairs across major versions
const DEBEZIUM_V1_TO_V2: [(&str, &str); 4] = [
    (
        "io.debezium.connector.mysql.MySqlConnector",
        "io.debezium.connector.v2.mysql.MySqlConnectorV2",
    ),
    (
        "io.debezium.connector.postgresql.PostgresConnector",
        "io.debezium.connector.v2.postgresql.PostgresConnectorV2",
    ),
    (
        "io.debezium.connector.sqlserver.SqlServerConnector",
        "io.debezium.connector.v2.sqlserver.SqlServerConnectorV2",
    ),
    (
        "io.debezium.connector.mariadb.MariaDbConnector",
        "io.debezium.connector.v2.mariadb.MariaDbConnector",
    ),
];

/// Which Debezium template generation to select for CDC connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebeziumVersion {
    V1,
    #[default]
    V2,
}

/// Metadata handed to a [`TemplateSelector`] when several templates remain
/// after deterministic selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCandidate {
    pub template_id: String,
    pub source: String,
}

/// Disambiguation capability invoked when several candidate templates
/// match a connector class and no automatic rule applies.
pub trait TemplateSelector: Send + Sync {
    fn select(
        &self,
        connector_class: &str,
        connector_name: Option<&str>,
        candidates: &[TemplateCandidate],
    ) -> Option<usize>;
}

/// Selector that always takes the first candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatchSelector;

impl TemplateSelector for FirstMatchSelector {
    fn select(
        &self,
        connector_class: &str,
        _connector_name: Option<&str>,
        candidates: &[TemplateCandidate],
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        tracing::info!(
            "Multiple templates found for {}, using first: {}",
            connector_class,
            candidates[0].template_id
        );
        Some(0)
    }
}

#[derive(Debug, Clone)]
struct LoadedTemplate {
    name: String,
    template: FmTemplate,
}

/// Repository of FM templates keyed by connector class
pub struct TemplateRepository {
    templates: Vec<LoadedTemplate>,
    debezium_version: DebeziumVersion,
    selector: Box<dyn TemplateSelector>,
}

impl std::fmt::Debug for TemplateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRepository")
            .field("templates", &self.templates.len())
            .field("debezium_version", &self.debezium_version)
            .finish_non_exhaustive()
    }
}

impl Default for TemplateRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
            debezium_version: DebeziumVersion::default(),
            selector: Box::new(FirstMatchSelector),
        }
    }

    /// Load every `*.json` template from a directory.
    ///
    /// Files that fail to read or parse are skipped with a warning; only a
    /// missing directory is an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> TemplateResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TemplateError::MissingDirectory(dir.to_path_buf()));
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut repository = Self::new();
        for path in paths {
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("Error reading template {}: {}", path.display(), e);
                    continue;
                }
            };
            let value: serde_json::Value = match serde_json::from_str(&contents) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Error parsing template {}: {}", path.display(), e);
                    continue;
                }
            };
            let template = match FmTemplate::from_json(&value) {
                Ok(template) => template,
                Err(e) => {
                    tracing::warn!("Error loading template {}: {}", path.display(), e);
                    continue;
                }
            };
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!("Loaded template: {}", name);
            repository.templates.push(LoadedTemplate { name, template });
        }

        tracing::info!(
            "Loaded {} templates from {}",
            repository.templates.len(),
            dir.display()
        );
        Ok(repository)
    }

    /// Add a template under the given name
    pub fn with_template(mut self, name: impl Into<String>, template: FmTemplate) -> Self {
        self.templates.push(LoadedTemplate {
            name: name.into(),
            template,
        });
        self
    }

    /// Set the Debezium generation used for CDC template selection
    pub fn with_debezium_version(mut self, version: DebeziumVersion) -> Self {
        self.debezium_version = version;
        self
    }

    /// Replace the ambiguity selector
    pub fn with_selector(mut self, selector: Box<dyn TemplateSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Find the FM template for a connector class, using the connector
    /// config (connection URL, `database.type`) for disambiguation.
    pub fn find_for_connector(
        &self,
        connector_class: &str,
        connector_name: Option<&str>,
        config: &BTreeMap<String, String>,
    ) -> Option<&FmTemplate> {
        let target_class = self.map_debezium_class(connector_class);

        let mut candidates: Vec<usize> = self
            .templates
            .iter()
            .enumerate()
            .filter(|(_, loaded)| {
                loaded
                    .template
                    .connector_classes()
                    .any(|class| class == target_class)
            })
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            if connector_class == SFTP_CSV_SOURCE_CLASS {
                if let Some(index) = self.find_by_template_id("SftpSource") {
                    tracing::info!("Mapped SFTP CSV connector to SftpSource template");
                    return Some(&self.templates[index].template);
                }
            }
            tracing::warn!("No FM templates found for connector.class: {}", connector_class);
            return None;
        }

        if candidates.len() == 1 {
            let loaded = &self.templates[candidates[0]];
            tracing::info!("Using single FM template: {}", loaded.name);
            return Some(&loaded.template);
        }

        // Several candidates: narrow CDC templates by generation first
        if is_cdc_class(connector_class) {
            let filtered = self.filter_cdc_candidates(&candidates);
            if filtered.len() == 1 {
                return Some(&self.templates[filtered[0]].template);
            }
            if !filtered.is_empty() {
                candidates = filtered;
            }
        }

        if connector_class == JDBC_SOURCE_CLASS || connector_class == JDBC_SINK_CLASS {
            if let Some(template) = self.auto_select_jdbc(connector_class, &candidates, config) {
                return Some(template);
            }
        }

        let candidate_info: Vec<TemplateCandidate> = candidates
            .iter()
            .map(|&i| TemplateCandidate {
                template_id: self.templates[i]
                    .template
                    .primary_template_id()
                    .unwrap_or("Unknown")
                    .to_string(),
                source: self.templates[i].name.clone(),
            })
            .collect();
        let choice = self
            .selector
            .select(connector_class, connector_name, &candidate_info)?;
        candidates
            .get(choice)
            .map(|&i| &self.templates[i].template)
    }

    fn map_debezium_class<'a>(&self, connector_class: &'a str) -> &'a str {
        match self.debezium_version {
            DebeziumVersion::V2 => DEBEZIUM_V1_TO_V2
                .iter()
                .find(|(v1, _)| *v1 == connector_class)
                .map(|(_, v2)| {
                    tracing::info!("Migrating Debezium v1 class {} to v2: {}", connector_class, v2);
                    *v2
                })
                .unwrap_or(connector_class),
            DebeziumVersion::V1 => DEBEZIUM_V1_TO_V2
                .iter()
                .find(|(_, v2)| *v2 == connector_class)
                .map(|(v1, _)| {
                    tracing::info!("Migrating Debezium v2 class {} to v1: {}", connector_class, v1);
                    *v1
                })
                .unwrap_or(connector_class),
        }
    }

    fn filter_cdc_candidates(&self, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&i| {
                let template_id = self.templates[i]
                    .template
                    .primary_template_id()
                    .unwrap_or_default()
                    .to_lowercase();
                match self.debezium_version {
                    DebeziumVersion::V2 => {
                        template_id.contains("v2") || !template_id.contains("cdc")
                    }
                    DebeziumVersion::V1 => !template_id.contains("v2"),
                }
            })
            .collect()
    }

    fn find_by_template_id(&self, template_id: &str) -> Option<usize> {
        self.templates.iter().position(|loaded| {
            loaded.template.primary_template_id() == Some(template_id)
                || loaded.name.starts_with(template_id)
        })
    }

    fn find_by_connector_class(&self, connector_class: &str) -> Option<usize> {
        self.templates.iter().position(|loaded| {
            loaded
                .template
                .connector_classes()
                .any(|class| class == connector_class)
        })
    }

    fn auto_select_jdbc(
        &self,
        connector_class: &str,
        candidates: &[usize],
        config: &BTreeMap<String, String>,
    ) -> Option<&FmTemplate> {
        let db_type = detect_database_type(config);
        tracing::info!("Detected database type: {}", db_type);

        let is_source = connector_class == JDBC_SOURCE_CLASS;

        // Snowflake has vendor-specific connector classes instead of
        // generic JDBC templates
        if db_type == DatabaseType::Snowflake {
            let snowflake_class = if is_source {
                SNOWFLAKE_SOURCE_CLASS
            } else {
                SNOWFLAKE_SINK_CLASS
            };
            if let Some(index) = self.find_by_connector_class(snowflake_class) {
                tracing::info!("Auto-selected Snowflake template: {}", self.templates[index].name);
                return Some(&self.templates[index].template);
            }
        }

        let expected: &[&str] = match db_type {
            DatabaseType::MySql => &["MySqlSource", "MySqlSink"],
            DatabaseType::Postgres => &["PostgresSource", "PostgresSink"],
            DatabaseType::Oracle => &["OracleDatabaseSource", "OracleDatabaseSink"],
            DatabaseType::SqlServer => &["MicrosoftSqlServerSource", "MicrosoftSqlServerSink"],
            DatabaseType::Snowflake => &["SnowflakeSource"],
            DatabaseType::Unknown => &[],
        };

        for &i in candidates {
            let template_id = self.templates[i]
                .template
                .primary_template_id()
                .unwrap_or_default();
            if !expected.contains(&template_id) {
                continue;
            }
            let matches_direction = if is_source {
                template_id.contains("Source") || !template_id.contains("Sink")
            } else {
                template_id.contains("Sink") || !template_id.contains("Source")
            };
            if matches_direction {
                tracing::info!("Auto-selected JDBC template: {}", template_id);
                return Some(&self.templates[i].template);
            }
        }

        // Partial match on the template id as a last resort
        for &i in candidates {
            let template_id = self.templates[i]
                .template
                .primary_template_id()
                .unwrap_or_default()
                .to_lowercase();
            if db_type != DatabaseType::Unknown && template_id.contains(db_type.as_str()) {
                tracing::info!("Auto-selected JDBC template via partial match: {}", template_id);
                return Some(&self.templates[i].template);
            }
        }

        tracing::warn!(
            "Could not auto-select JDBC template for {} with database type {}",
            connector_class,
            db_type
        );
        None
    }
}

fn is_cdc_class(connector_class: &str) -> bool {
    DEBEZIUM_V1_TO_V2
        .iter()
        .any(|(v1, v2)| *v1 == connector_class || *v2 == connector_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jdbc_template(template_id: &str, connector_class: &str) -> FmTemplate {
        FmTemplate::from_json(&json!({
            "connector.class": connector_class,
            "templates": [{
                "template_id": template_id,
                "config_defs": [{"name": "connection.host"}]
            }]
        }))
        .unwrap()
    }

    fn config_with_url(url: &str) -> BTreeMap<String, String> {
        let mut config = BTreeMap::new();
        config.insert("connection.url".to_string(), url.to_string());
        config
    }

    #[test]
    fn test_single_candidate_selected() {
        let repository = TemplateRepository::new()
            .with_template("S3Sink", jdbc_template("S3Sink", "io.confluent.connect.s3.S3SinkConnector"));
        let template = repository
            .find_for_connector("io.confluent.connect.s3.S3SinkConnector", None, &BTreeMap::new())
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("S3Sink"));
    }

    #[test]
    fn test_no_candidate_returns_none() {
        let repository = TemplateRepository::new();
        assert!(
            repository
                .find_for_connector("com.example.Missing", None, &BTreeMap::new())
                .is_none()
        );
    }

    #[test]
    fn test_jdbc_auto_select_by_database_type() {
        let repository = TemplateRepository::new()
            .with_template("MySqlSource", jdbc_template("MySqlSource", JDBC_SOURCE_CLASS))
            .with_template("PostgresSource", jdbc_template("PostgresSource", JDBC_SOURCE_CLASS));

        let template = repository
            .find_for_connector(
                JDBC_SOURCE_CLASS,
                Some("orders-source"),
                &config_with_url("jdbc:postgresql://db:5432/orders"),
            )
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("PostgresSource"));

        let template = repository
            .find_for_connector(
                JDBC_SOURCE_CLASS,
                None,
                &config_with_url("jdbc:mysql://db:3306/orders"),
            )
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("MySqlSource"));
    }

    #[test]
    fn test_jdbc_snowflake_rewrites_connector_class() {
        let repository = TemplateRepository::new()
            .with_template("MySqlSource", jdbc_template("MySqlSource", JDBC_SOURCE_CLASS))
            .with_template("PostgresSource", jdbc_template("PostgresSource", JDBC_SOURCE_CLASS))
            .with_template(
                "SnowflakeSource",
                jdbc_template("SnowflakeSource", SNOWFLAKE_SOURCE_CLASS),
            );

        let template = repository
            .find_for_connector(
                JDBC_SOURCE_CLASS,
                None,
                &config_with_url("jdbc:snowflake://acct.snowflakecomputing.com/?db=sales"),
            )
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("SnowflakeSource"));
    }

    #[test]
    fn test_jdbc_unknown_database_falls_back_to_selector() {
        let repository = TemplateRepository::new()
            .with_template("MySqlSource", jdbc_template("MySqlSource", JDBC_SOURCE_CLASS))
            .with_template("PostgresSource", jdbc_template("PostgresSource", JDBC_SOURCE_CLASS));

        // FirstMatchSelector picks the first loaded candidate
        let template = repository
            .find_for_connector(JDBC_SOURCE_CLASS, None, &BTreeMap::new())
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("MySqlSource"));
    }

    #[test]
    fn test_debezium_v1_class_mapped_to_v2_template() {
        let repository = TemplateRepository::new().with_template(
            "MySqlCdcSourceV2",
            jdbc_template("MySqlCdcSourceV2", "io.debezium.connector.v2.mysql.MySqlConnectorV2"),
        );

        let template = repository
            .find_for_connector(
                "io.debezium.connector.mysql.MySqlConnector",
                None,
                &BTreeMap::new(),
            )
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("MySqlCdcSourceV2"));
    }

    #[test]
    fn test_sftp_fallback_template() {
        let repository = TemplateRepository::new().with_template(
            "SftpSource_resolved_templates",
            jdbc_template("SftpSource", "io.confluent.connect.sftp.SftpSourceConnector"),
        );

        let template = repository
            .find_for_connector(SFTP_CSV_SOURCE_CLASS, None, &BTreeMap::new())
            .unwrap();
        assert_eq!(template.primary_template_id(), Some("SftpSource"));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            serde_json::to_string(&json!({
                "connector.class": "com.example.Good",
                "templates": [{"template_id": "Good", "config_defs": []}]
            }))
            .unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "nope").unwrap();

        let repository = TemplateRepository::load_dir(dir.path()).unwrap();
        assert_eq!(repository.len(), 1);
        assert!(
            repository
                .find_for_connector("com.example.Good", None, &BTreeMap::new())
                .is_some()
        );
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let err = TemplateRepository::load_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, TemplateError::MissingDirectory(_)));
    }
}
