//! Built-in derivation functions for well-known FM properties
//!
//! Each registered function derives one FM property from the user's
//! configuration, following the same internal precedence: explicit user
//! key (including vendor aliases), value parsed out of a connection
//! string, an already-resolved sibling FM value, the template default
//! (resolved recursively when it is itself a placeholder), and finally a
//! hardcoded fallback constant.

use std::collections::BTreeMap;

use crate::connection::{
    parse_jdbc_url, parse_mongodb_connection_string, parse_redis_url,
    parse_servicebus_connection_string,
};
use crate::template::{TemplateConfigDef, find_config_def};

/// Inputs handed to a derivation function
pub struct DerivationContext<'a> {
    pub user_configs: &'a BTreeMap<String, String>,
    pub fm_configs: &'a BTreeMap<String, String>,
    pub config_defs: &'a [&'a TemplateConfigDef],
    pub config_name: &'a str,
}

/// A derivation function: best-effort value for one FM property
pub type DerivationFn = fn(&DerivationContext<'_>) -> Option<String>;

/// Fixed catalog of derivation functions keyed by FM property name
pub struct DerivationRegistry {
    table: BTreeMap<&'static str, DerivationFn>,
}

impl Default for DerivationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DerivationRegistry {
    /// The built-in catalog
    pub fn builtin() -> Self {
        let mut table: BTreeMap<&'static str, DerivationFn> = BTreeMap::new();

        // Connection configs
        table.insert("connection.url", derive_connection_url);
        table.insert("connection.host", derive_connection_host);
        table.insert("connection.port", derive_connection_port);
        table.insert("connection.user", derive_connection_user);
        table.insert("connection.password", derive_connection_password);
        table.insert("connection.database", derive_connection_database);
        table.insert("db.name", derive_db_name);
        table.insert("db.connection.type", derive_db_connection_type);
        table.insert("ssl.server.cert.dn", derive_ssl_server_cert_dn);
        table.insert("database.server.name", derive_database_server_name);

        // Data format configs
        table.insert("input.key.format", derive_input_key_format);
        table.insert("input.data.format", derive_input_data_format);
        table.insert("output.key.format", derive_output_key_format);
        table.insert("output.data.format", derive_output_data_format);
        table.insert("output.data.key.format", derive_output_data_key_format);
        table.insert("output.data.value.format", derive_output_data_value_format);

        // Security configs
        table.insert("ssl.mode", derive_ssl_mode);
        table.insert("authentication.method", derive_authentication_method);
        table.insert("csfle.enabled", derive_csfle_enabled);
        table.insert("csfle.onFailure", derive_csfle_on_failure);

        // Redis configs
        table.insert("redis.hostname", derive_redis_hostname);
        table.insert("redis.portnumber", derive_redis_portnumber);
        table.insert("redis.ssl.mode", derive_redis_ssl_mode);

        // Azure Service Bus configs
        table.insert("azure.servicebus.namespace", derive_servicebus_namespace);
        table.insert("azure.servicebus.sas.keyname", derive_servicebus_sas_keyname);
        table.insert("azure.servicebus.sas.key", derive_servicebus_sas_key);
        table.insert("azure.servicebus.entity.name", derive_servicebus_entity_name);

        // Subject name strategy configs
        table.insert("key.converter.key.subject.name.strategy", derive_subject_name_strategy);
        table.insert("value.converter.value.subject.name.strategy", derive_subject_name_strategy);
        table.insert("key.subject.name.strategy", derive_subject_name_strategy);
        table.insert("subject.name.strategy", derive_subject_name_strategy);
        table.insert("value.subject.name.strategy", derive_subject_name_strategy);
        table.insert(
            "value.converter.reference.subject.name.strategy",
            derive_reference_subject_name_strategy,
        );
        table.insert(
            "key.converter.reference.subject.name.strategy",
            derive_reference_subject_name_strategy,
        );

        Self { table }
    }

    /// Look up the derivation for an FM property (exact name match only)
    pub fn get(&self, config_name: &str) -> Option<DerivationFn> {
        self.table.get(config_name).copied()
    }

    pub fn contains(&self, config_name: &str) -> bool {
        self.table.contains_key(config_name)
    }
}

/// Converter class to FM format reverse mapping
const REVERSE_FORMAT_MAPPING: [(&str, &str); 6] = [
    ("io.confluent.connect.avro.AvroConverter", "AVRO"),
    ("io.confluent.connect.json.JsonSchemaConverter", "JSON_SR"),
    ("io.confluent.connect.protobuf.ProtobufConverter", "PROTOBUF"),
    ("org.apache.kafka.connect.converters.ByteArrayConverter", "BYTES"),
    ("org.apache.kafka.connect.json.JsonConverter", "JSON"),
    ("org.apache.kafka.connect.storage.StringConverter", "STRING"),
];

fn converter_format(converter_class: &str) -> Option<&'static str> {
    REVERSE_FORMAT_MAPPING
        .iter()
        .find(|(class, _)| *class == converter_class)
        .map(|(_, format)| *format)
}

/// Whether a config value is a `${name}` placeholder
pub(crate) fn is_placeholder(value: &str) -> bool {
    value.starts_with("${")
}

/// Extract the name from a `${name}` placeholder
pub(crate) fn extract_placeholder_name(placeholder: &str) -> &str {
    match placeholder.strip_prefix("${") {
        Some(rest) => rest.find('}').map(|end| &rest[..end]).unwrap_or(rest),
        None => placeholder,
    }
}

/// Resolve a template default, substituting an already-resolved FM value
/// when the default is a placeholder. Unresolvable placeholders stay
/// literal.
pub(crate) fn resolve_default(template_default: &str, fm_configs: &BTreeMap<String, String>) -> String {
    if is_placeholder(template_default) {
        let placeholder_name = extract_placeholder_name(template_default);
        if let Some(resolved) = fm_configs.get(placeholder_name) {
            return resolved.clone();
        }
        tracing::warn!("Placeholder '{}' not resolved in FM configs", placeholder_name);
    }
    template_default.to_string()
}

fn template_default(ctx: &DerivationContext<'_>, config_name: &str) -> Option<String> {
    find_config_def(ctx.config_defs, config_name)?.default_value_str()
}

fn resolved_template_default(ctx: &DerivationContext<'_>, config_name: &str) -> Option<String> {
    template_default(ctx, config_name).map(|default| resolve_default(&default, ctx.fm_configs))
}

fn mongo_info(ctx: &DerivationContext<'_>) -> Option<crate::connection::MongoConnectionInfo> {
    for key in ["connection.uri", "mongodb.connection.string", "connection.string"] {
        if let Some(uri) = ctx.user_configs.get(key) {
            return Some(parse_mongodb_connection_string(uri));
        }
    }
    None
}

fn jdbc_url<'a>(ctx: &DerivationContext<'a>) -> Option<&'a String> {
    ctx.user_configs
        .get("connection.url")
        .filter(|url| url.starts_with("jdbc:"))
}

fn derive_connection_url(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = ctx.user_configs.get("connection.url") {
        if url.contains("jdbc:snowflake://") {
            return Some(url.replacen("jdbc:snowflake://", "", 1).trim().to_string());
        }
        if url.starts_with("jdbc:") {
            return None;
        }
    }
    resolved_template_default(ctx, "connection.url")
}

fn derive_connection_host(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).host;
    }
    mongo_info(ctx)?.host
}

fn derive_connection_port(ctx: &DerivationContext<'_>) -> Option<String> {
    parse_jdbc_url(jdbc_url(ctx)?).port
}

fn derive_connection_user(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).user;
    }
    mongo_info(ctx)?.user
}

fn derive_connection_password(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).password;
    }
    mongo_info(ctx)?.password
}

fn derive_connection_database(ctx: &DerivationContext<'_>) -> Option<String> {
    parse_jdbc_url(jdbc_url(ctx)?).db_name
}

fn derive_db_name(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).db_name;
    }
    if let Some(info) = mongo_info(ctx) {
        return info.database;
    }
    if let Some(name) = ctx.user_configs.get("db.name") {
        return Some(name.clone());
    }
    ctx.user_configs.get("database").cloned()
}

fn derive_db_connection_type(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).db_connection_type;
    }
    ctx.user_configs.get("db.connection.type").cloned()
}

fn derive_ssl_server_cert_dn(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).ssl_server_cert_dn;
    }
    ctx.user_configs.get("ssl.server.cert.dn").cloned()
}

fn derive_database_server_name(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(url) = jdbc_url(ctx) {
        return parse_jdbc_url(url).host;
    }
    if let Some(name) = ctx.user_configs.get("database.server.name") {
        return Some(name.clone());
    }
    ctx.user_configs.get("server.name").cloned()
}

/// Shared format-derivation sequence: converter reverse map, explicit
/// format keys, schemas.enable hint, resolved sibling, template default,
/// JSON fallback.
fn derive_format(
    ctx: &DerivationContext<'_>,
    converter_key: &str,
    format_keys: &[&str],
    schemas_enable_key: Option<&str>,
    sibling_key: Option<&str>,
    uppercase_direct: bool,
    own_name: &str,
) -> Option<String> {
    if let Some(converter_class) = ctx.user_configs.get(converter_key) {
        return Some(match converter_format(converter_class) {
            Some(format) => format.to_string(),
            None => converter_class.clone(),
        });
    }

    for format_key in format_keys {
        if let Some(format) = ctx.user_configs.get(*format_key) {
            return Some(if uppercase_direct {
                format.to_uppercase()
            } else {
                format.clone()
            });
        }
    }

    if let Some(schemas_key) = schemas_enable_key {
        if ctx.user_configs.contains_key(schemas_key) {
            return Some("JSON_SR".to_string());
        }
    }

    if let Some(sibling) = sibling_key {
        if let Some(value) = ctx.fm_configs.get(sibling) {
            return Some(value.clone());
        }
    }

    if let Some(default) = resolved_template_default(ctx, own_name) {
        return Some(default.to_uppercase());
    }

    Some("JSON".to_string())
}

fn derive_input_key_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "key.converter",
        &["key.format", "input.key.format"],
        Some("key.converter.schemas.enable"),
        None,
        true,
        "input.key.format",
    )
}

fn derive_input_data_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "value.converter",
        &["value.format", "input.data.format"],
        Some("value.converter.schemas.enable"),
        None,
        true,
        "input.data.format",
    )
}

fn derive_output_key_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "key.converter",
        &["output.key.format", "key.format"],
        None,
        None,
        true,
        "output.key.format",
    )
}

fn derive_output_data_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "value.converter",
        &["output.data.format", "value.format"],
        None,
        None,
        false,
        "output.data.format",
    )
}

fn derive_output_data_key_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "key.converter",
        &["output.data.key.format", "key.format"],
        None,
        Some("output.key.format"),
        true,
        "output.data.key.format",
    )
}

fn derive_output_data_value_format(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_format(
        ctx,
        "value.converter",
        &["output.data.value.format", "value.format"],
        None,
        Some("output.data.format"),
        true,
        "output.data.value.format",
    )
}

fn normalize_ssl_mode(value: &str) -> Option<&'static str> {
    match value {
        "prefer" | "preferred" => Some("prefer"),
        "require" | "required" => Some("require"),
        "verify-ca" | "verifyca" | "verify_ca" => Some("verify-ca"),
        "verify-full" | "verifyfull" | "verify_full" => Some("verify-full"),
        "disabled" | "disable" | "false" | "none" => Some("disabled"),
        _ => None,
    }
}

fn derive_ssl_mode(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(value) = ctx.user_configs.get("ssl.mode") {
        if let Some(mode) = normalize_ssl_mode(&value.to_lowercase()) {
            return Some(mode.to_string());
        }
    }

    // Vendor-specific SSL settings, boolean and enum forms
    for config_key in [
        "connection.sslmode",
        "connection.sslMode",
        "database.ssl.mode",
        "redis.ssl.mode",
        "ssl.enabled",
        "use.ssl",
        "ssl.use",
    ] {
        if let Some(value) = ctx.user_configs.get(config_key) {
            let value = value.to_lowercase();
            if ["true", "yes", "1", "enabled"].contains(&value.as_str()) {
                return Some("require".to_string());
            }
            if ["false", "no", "0", "disabled"].contains(&value.as_str()) {
                return Some("disabled".to_string());
            }
            if let Some(mode) = normalize_ssl_mode(&value) {
                return Some(mode.to_string());
            }
        }
    }

    // Truststore and certificate files imply SSL even without a mode
    for indicator in [
        "ssl.truststorefile",
        "ssl.truststorepassword",
        "ssl.rootcertfile",
        "connection.javax.net.ssl.trustStore",
        "connection.javax.net.ssl.trustStorePassword",
        "ssl.truststore.file",
        "ssl.truststore.password",
        "ssl.cert.file",
        "ssl.key.file",
        "ssl.ca.file",
        "ssl.certificate.file",
    ] {
        if let Some(value) = ctx.user_configs.get(indicator).filter(|v| !v.is_empty()) {
            let value = value.to_lowercase();
            if value.contains("verify") || value.contains("cert") {
                return Some("verify-ca".to_string());
            }
            return Some("require".to_string());
        }
    }

    if let Some(url) = ctx.user_configs.get("connection.url") {
        let url = url.to_lowercase();
        if url.contains("ssl=true") || url.contains("sslmode=") {
            if url.contains("sslmode=prefer") {
                return Some("prefer".to_string());
            }
            if url.contains("sslmode=require") {
                return Some("require".to_string());
            }
            if url.contains("sslmode=verify-ca") {
                return Some("verify-ca".to_string());
            }
            if url.contains("sslmode=verify-full") {
                return Some("verify-full".to_string());
            }
            if url.contains("sslmode=disable") {
                return Some("disabled".to_string());
            }
            return Some("require".to_string());
        }
    }

    if let Some(default) = resolved_template_default(ctx, "ssl.mode") {
        return Some(default);
    }

    Some("prefer".to_string())
}

fn derive_authentication_method(ctx: &DerivationContext<'_>) -> Option<String> {
    for auth_config in [
        "security.protocol",
        "sasl.mechanism",
        "authentication.type",
        "auth.method",
    ] {
        if let Some(value) = ctx.user_configs.get(auth_config) {
            let value = value.to_lowercase();
            return Some(if value.contains("plain") {
                "PLAIN".to_string()
            } else if value.contains("scram") {
                "SCRAM".to_string()
            } else if value.contains("oauth") || value.contains("bearer") {
                "OAUTHBEARER".to_string()
            } else if value.contains("ssl") || value.contains("tls") {
                "SSL".to_string()
            } else {
                value.to_uppercase()
            });
        }
    }

    if let Some(default) = resolved_template_default(ctx, "authentication.method") {
        return Some(default);
    }

    Some("PLAIN".to_string())
}

fn derive_csfle_enabled(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(default) = resolved_template_default(ctx, "csfle.enabled") {
        return Some(default);
    }
    Some("false".to_string())
}

fn derive_csfle_on_failure(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(default) = resolved_template_default(ctx, "csfle.onFailure") {
        return Some(default);
    }
    Some("FAIL".to_string())
}

fn derive_redis_hostname(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(hostname) = ctx.user_configs.get("redis.hostname") {
        return Some(hostname.clone());
    }

    for config_key in [
        "redis.host",
        "redis.server",
        "redis.address",
        "redis.endpoint",
        "host",
        "server",
        "address",
        "endpoint",
    ] {
        if let Some(value) = ctx.user_configs.get(config_key) {
            return Some(match value.split_once(':') {
                Some((host, _)) => host.to_string(),
                None => value.clone(),
            });
        }
    }

    if let Some(hosts) = ctx.user_configs.get("redis.hosts") {
        if let Some((host, _)) = hosts.split_once(':') {
            return Some(host.to_string());
        }
    }

    for config_key in ["connection.url", "connection.uri", "redis.connection.url"] {
        if let Some(url) = ctx.user_configs.get(config_key) {
            if url.to_lowercase().contains("redis://") {
                return parse_redis_url(url).host;
            }
        }
    }

    None
}

fn derive_redis_portnumber(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(port) = ctx.user_configs.get("redis.portnumber") {
        return Some(port.clone());
    }

    for config_key in ["redis.port", "redis.server.port", "port", "server.port"] {
        if let Some(port) = ctx.user_configs.get(config_key) {
            return Some(port.clone());
        }
    }

    if let Some(hosts) = ctx.user_configs.get("redis.hosts") {
        if let Some((_, port)) = hosts.split_once(':') {
            let port = port.split('/').next().unwrap_or(port);
            return Some(port.to_string());
        }
    }

    for config_key in ["connection.url", "connection.uri", "redis.connection.url"] {
        if let Some(url) = ctx.user_configs.get(config_key) {
            if url.to_lowercase().contains("redis://") {
                if let Some(port) = parse_redis_url(url).port {
                    return Some(port);
                }
            }
        }
    }

    if let Some(default) = resolved_template_default(ctx, "redis.portnumber") {
        return Some(default);
    }

    Some("6379".to_string())
}

fn derive_redis_ssl_mode(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(raw) = ctx.user_configs.get("redis.ssl.mode") {
        let value = raw.to_lowercase();
        return Some(match value.as_str() {
            "disabled" | "disable" | "false" | "none" | "off" => "disabled".to_string(),
            "enabled" | "enable" | "true" | "on" => "enabled".to_string(),
            "server" | "server-only" | "verify-server" => "server".to_string(),
            "server+client" | "mutual" | "two-way" => "server+client".to_string(),
            _ => raw.clone(),
        });
    }

    for config_key in ["redis.ssl.enabled", "redis.ssl", "ssl.enabled", "use.ssl"] {
        if let Some(value) = ctx.user_configs.get(config_key) {
            let value = value.to_lowercase();
            if ["true", "yes", "1", "enabled", "on"].contains(&value.as_str()) {
                return Some("enabled".to_string());
            }
            if ["false", "no", "0", "disabled", "off"].contains(&value.as_str()) {
                return Some("disabled".to_string());
            }
        }
    }

    for indicator in [
        "redis.ssl.keystore.file",
        "redis.ssl.keystore.password",
        "redis.ssl.truststore.file",
        "redis.ssl.truststore.password",
        "redis.ssl.cert.file",
        "redis.ssl.key.file",
        "redis.ssl.ca.file",
    ] {
        if let Some(value) = ctx.user_configs.get(indicator).filter(|v| !v.is_empty()) {
            if value.to_lowercase().contains("client") || indicator.contains("keystore") {
                return Some("server+client".to_string());
            }
            return Some("server".to_string());
        }
    }

    for config_key in ["connection.url", "connection.uri", "redis.connection.url"] {
        if let Some(url) = ctx.user_configs.get(config_key) {
            let url = url.to_lowercase();
            if url.contains("rediss://") {
                return Some("enabled".to_string());
            }
            if url.contains("redis://") && url.contains("ssl=true") {
                return Some("enabled".to_string());
            }
            if url.contains("redis://") && url.contains("ssl=false") {
                return Some("disabled".to_string());
            }
        }
    }

    if let Some(default) = resolved_template_default(ctx, "redis.ssl.mode") {
        return Some(default);
    }

    Some("disabled".to_string())
}

fn servicebus_connection_string<'a>(ctx: &DerivationContext<'a>) -> Option<&'a String> {
    ctx.user_configs.get("azure.servicebus.connection.string")
}

fn derive_servicebus_namespace(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(namespace) = ctx.user_configs.get("azure.servicebus.namespace") {
        return Some(namespace.clone());
    }
    parse_servicebus_connection_string(servicebus_connection_string(ctx)?).namespace
}

fn derive_servicebus_sas_keyname(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(key_name) = ctx.user_configs.get("azure.servicebus.sas.keyname") {
        return Some(key_name.clone());
    }
    parse_servicebus_connection_string(servicebus_connection_string(ctx)?).sas_key_name
}

fn derive_servicebus_sas_key(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(key) = ctx.user_configs.get("azure.servicebus.sas.key") {
        return Some(key.clone());
    }
    parse_servicebus_connection_string(servicebus_connection_string(ctx)?).sas_key
}

fn derive_servicebus_entity_name(ctx: &DerivationContext<'_>) -> Option<String> {
    if let Some(entity) = ctx.user_configs.get("azure.servicebus.entity.name") {
        return Some(entity.clone());
    }
    parse_servicebus_connection_string(servicebus_connection_string(ctx)?).entity_path
}

fn derive_strategy_from_recommended(
    ctx: &DerivationContext<'_>,
    fallback: &[&str],
) -> Option<String> {
    let recommended: Vec<String> = match find_config_def(ctx.config_defs, ctx.config_name) {
        Some(def) if !def.recommended_values.is_empty() => def.recommended_values.clone(),
        _ => fallback.iter().map(|s| s.to_string()).collect(),
    };

    let config_value = ctx.user_configs.get(ctx.config_name)?;
    // Strategy classes are fully qualified; compare the final path segment
    let short_value = config_value.rsplit('.').next().unwrap_or(config_value);

    recommended
        .iter()
        .find(|strategy| strategy.eq_ignore_ascii_case(short_value))
        .cloned()
}

fn derive_subject_name_strategy(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_strategy_from_recommended(
        ctx,
        &["TopicNameStrategy", "RecordNameStrategy", "TopicRecordNameStrategy"],
    )
}

fn derive_reference_subject_name_strategy(ctx: &DerivationContext<'_>) -> Option<String> {
    derive_strategy_from_recommended(
        ctx,
        &["DefaultReferenceSubjectNameStrategy", "QualifiedReferenceSubjectNameStrategy"],
    )
}
