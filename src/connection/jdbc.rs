//! JDBC URL parsing and database type detection

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ORACLE_HOST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(HOST=([^)]+)\)").unwrap());
static ORACLE_PORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(PORT=([^)]+)\)").unwrap());
static ORACLE_CONNECT_DATA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(CONNECT_DATA=\(([^=)]+)=([^)]+)\)\)").unwrap());
static ORACLE_SSL_CERT_DN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)SSL_SERVER_CERT_DN=\\?"?([^)"]+)\\?"?\)"#).unwrap());

static JDBC_HOST_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"jdbc:[^:]+://([^:/]+)").unwrap());
static JDBC_PORT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"://[^:]+:(\d+)").unwrap());
static JDBC_DB_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"://[^/]+/([^/?]+)").unwrap());
static JDBC_USER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]user=([^&]+)").unwrap());
static JDBC_PASSWORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]password=([^&]+)").unwrap());

/// Connection details extracted from a JDBC URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcConnectionInfo {
    pub host: Option<String>,
    pub port: Option<String>,
    pub db_name: Option<String>,
    pub db_connection_type: Option<String>,
    pub ssl_server_cert_dn: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Parse a JDBC URL into its connection details.
///
/// Two formats are supported. The Oracle descriptor form is recognised by
/// the `@(DESCRIPTION=` marker and parsed with keyword extraction; every
/// other URL goes through standard `jdbc:<scheme>://host:port/db?params`
/// parsing on the lowercased URL.
pub fn parse_jdbc_url(url: &str) -> JdbcConnectionInfo {
    let mut info = JdbcConnectionInfo::default();

    tracing::debug!("Parsing JDBC URL: {}", url);

    if url.to_uppercase().contains("@(DESCRIPTION=") {
        tracing::debug!("Detected Oracle descriptor format");
        if let Some(caps) = ORACLE_HOST_REGEX.captures(url) {
            info.host = Some(caps[1].to_string());
        }
        if let Some(caps) = ORACLE_PORT_REGEX.captures(url) {
            info.port = Some(caps[1].to_string());
        }
        if let Some(caps) = ORACLE_CONNECT_DATA_REGEX.captures(url) {
            info.db_connection_type = Some(caps[1].to_string());
            info.db_name = Some(caps[2].to_string());
        }
        if let Some(caps) = ORACLE_SSL_CERT_DN_REGEX.captures(url) {
            info.ssl_server_cert_dn = Some(caps[1].to_string());
        }
        return info;
    }

    let url = url.to_lowercase();

    if let Some(caps) = JDBC_HOST_REGEX.captures(&url) {
        info.host = Some(caps[1].to_string());
    }
    if let Some(caps) = JDBC_PORT_REGEX.captures(&url) {
        info.port = Some(caps[1].to_string());
    }
    if let Some(caps) = JDBC_DB_REGEX.captures(&url) {
        info.db_name = Some(caps[1].to_string());
    }
    if let Some(caps) = JDBC_USER_REGEX.captures(&url) {
        info.user = Some(caps[1].to_string());
    }
    if let Some(caps) = JDBC_PASSWORD_REGEX.captures(&url) {
        info.password = Some(caps[1].to_string());
    }

    info
}

/// Database vendors recognised in JDBC connection URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    MySql,
    Oracle,
    SqlServer,
    Postgres,
    Snowflake,
    Unknown,
}

impl DatabaseType {
    /// All detectable vendors, in detection priority order
    pub const DETECTABLE: [DatabaseType; 5] = [
        DatabaseType::MySql,
        DatabaseType::Oracle,
        DatabaseType::SqlServer,
        DatabaseType::Postgres,
        DatabaseType::Snowflake,
    ];

    /// URL scheme substrings that identify this vendor
    pub fn url_patterns(&self) -> &'static [&'static str] {
        match self {
            DatabaseType::MySql => &["mysql", "mariadb"],
            DatabaseType::Oracle => &["oracle", "oracle:thin"],
            DatabaseType::SqlServer => &["sqlserver", "mssql"],
            DatabaseType::Postgres => &["postgresql", "postgres"],
            DatabaseType::Snowflake => &["snowflake"],
            DatabaseType::Unknown => &[],
        }
    }

    /// Conventional port for this vendor
    pub fn default_port(&self) -> Option<&'static str> {
        match self {
            DatabaseType::MySql => Some("3306"),
            DatabaseType::Oracle => Some("1521"),
            DatabaseType::SqlServer => Some("1433"),
            DatabaseType::Postgres => Some("5432"),
            DatabaseType::Snowflake => Some("443"),
            DatabaseType::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySql => "mysql",
            DatabaseType::Oracle => "oracle",
            DatabaseType::SqlServer => "sqlserver",
            DatabaseType::Postgres => "postgresql",
            DatabaseType::Snowflake => "snowflake",
            DatabaseType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::MySql),
            "oracle" => Ok(DatabaseType::Oracle),
            "sqlserver" | "mssql" => Ok(DatabaseType::SqlServer),
            "postgresql" | "postgres" => Ok(DatabaseType::Postgres),
            "snowflake" => Ok(DatabaseType::Snowflake),
            _ => Err(format!("Unknown database type: {}", s)),
        }
    }
}

/// Determine the database vendor from a connector configuration.
///
/// Looks at `connection.url` first with a precise `jdbc:<scheme>://` match,
/// then falls back to plain substring matching, and finally to an explicit
/// `database.type` config entry.
pub fn detect_database_type(config: &BTreeMap<String, String>) -> DatabaseType {
    if let Some(url) = config.get("connection.url") {
        let url = url.to_lowercase();
        tracing::debug!("Analyzing JDBC URL for database type: {}", url);

        for db_type in DatabaseType::DETECTABLE {
            for pattern in db_type.url_patterns() {
                if url.contains(&format!("jdbc:{}://", pattern)) {
                    tracing::debug!("Detected database type '{}' via jdbc scheme", db_type);
                    return db_type;
                }
            }
        }

        for db_type in DatabaseType::DETECTABLE {
            if db_type.url_patterns().iter().any(|p| url.contains(p)) {
                tracing::debug!("Detected database type '{}' via substring fallback", db_type);
                return db_type;
            }
        }

        tracing::warn!("No database type detected for URL: {}", url);
    }

    if let Some(db_type) = config.get("database.type") {
        if let Ok(parsed) = db_type.parse::<DatabaseType>() {
            tracing::debug!("Using database type from config: {}", parsed);
            return parsed;
        }
    }

    DatabaseType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> BTreeMap<String, String> {
        let mut config = BTreeMap::new();
        config.insert("connection.url".to_string(), url.to_string());
        config
    }

    #[test]
    fn test_parse_standard_postgres_url() {
        let info = parse_jdbc_url("jdbc:postgresql://localhost:5432/mydb");
        assert_eq!(info.host.as_deref(), Some("localhost"));
        assert_eq!(info.port.as_deref(), Some("5432"));
        assert_eq!(info.db_name.as_deref(), Some("mydb"));
        assert_eq!(info.user, None);
        assert_eq!(info.password, None);
    }

    #[test]
    fn test_parse_url_with_credentials() {
        let info =
            parse_jdbc_url("jdbc:mysql://db.example.com:3306/sales?user=alice&password=secret");
        assert_eq!(info.host.as_deref(), Some("db.example.com"));
        assert_eq!(info.port.as_deref(), Some("3306"));
        assert_eq!(info.db_name.as_deref(), Some("sales"));
        assert_eq!(info.user.as_deref(), Some("alice"));
        assert_eq!(info.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_parse_url_without_port() {
        let info = parse_jdbc_url("jdbc:sqlserver://dbhost/warehouse");
        assert_eq!(info.host.as_deref(), Some("dbhost"));
        assert_eq!(info.port, None);
        assert_eq!(info.db_name.as_deref(), Some("warehouse"));
    }

    #[test]
    fn test_parse_oracle_descriptor() {
        let url = "jdbc:oracle:thin:@(DESCRIPTION=(ADDRESS=(PROTOCOL=TCPS)(HOST=myhost)(PORT=1521))(CONNECT_DATA=(SERVICE_NAME=orcl)))";
        let info = parse_jdbc_url(url);
        assert_eq!(info.host.as_deref(), Some("myhost"));
        assert_eq!(info.port.as_deref(), Some("1521"));
        assert_eq!(info.db_connection_type.as_deref(), Some("SERVICE_NAME"));
        assert_eq!(info.db_name.as_deref(), Some("orcl"));
    }

    #[test]
    fn test_parse_oracle_descriptor_with_ssl_cert_dn() {
        let url = r#"jdbc:oracle:thin:@(DESCRIPTION=(ADDRESS=(PROTOCOL=TCPS)(HOST=dbhost)(PORT=2484))(CONNECT_DATA=(SID=orcl))(SECURITY=(SSL_SERVER_CERT_DN="CN=dbhost,O=Acme")))"#;
        let info = parse_jdbc_url(url);
        assert_eq!(info.host.as_deref(), Some("dbhost"));
        assert_eq!(info.db_connection_type.as_deref(), Some("SID"));
        assert_eq!(info.ssl_server_cert_dn.as_deref(), Some("CN=dbhost,O=Acme"));
    }

    #[test]
    fn test_parse_malformed_url_returns_partial() {
        let info = parse_jdbc_url("not-a-jdbc-url");
        assert_eq!(info, JdbcConnectionInfo::default());
    }

    #[test]
    fn test_detect_database_type_precise() {
        assert_eq!(
            detect_database_type(&config_with_url("jdbc:mysql://h:3306/db")),
            DatabaseType::MySql
        );
        assert_eq!(
            detect_database_type(&config_with_url("jdbc:postgresql://h:5432/db")),
            DatabaseType::Postgres
        );
        assert_eq!(
            detect_database_type(&config_with_url("jdbc:snowflake://acct.snowflakecomputing.com")),
            DatabaseType::Snowflake
        );
    }

    #[test]
    fn test_detect_database_type_fallback_substring() {
        // Oracle descriptor URLs have no jdbc:<scheme>:// match
        let config = config_with_url("jdbc:oracle:thin:@(DESCRIPTION=(HOST=h)(PORT=1521))");
        assert_eq!(detect_database_type(&config), DatabaseType::Oracle);
    }

    #[test]
    fn test_detect_database_type_from_config_key() {
        let mut config = BTreeMap::new();
        config.insert("database.type".to_string(), "SqlServer".to_string());
        assert_eq!(detect_database_type(&config), DatabaseType::SqlServer);
    }

    #[test]
    fn test_detect_database_type_unknown() {
        assert_eq!(
            detect_database_type(&config_with_url("jdbc:db2://h:50000/db")),
            DatabaseType::Unknown
        );
        assert_eq!(detect_database_type(&BTreeMap::new()), DatabaseType::Unknown);
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(DatabaseType::MySql.default_port(), Some("3306"));
        assert_eq!(DatabaseType::Oracle.default_port(), Some("1521"));
        assert_eq!(DatabaseType::Unknown.default_port(), None);
    }
}
