//! Connector Migration SDK - library for moving self-managed Kafka Connect
//! connector configurations onto fully-managed cloud connector templates
//!
//! Provides unified interfaces for:
//! - Connection string parsing (JDBC, MongoDB, Redis, Azure Service Bus)
//! - FM template loading, indexing and deterministic selection
//! - Property-by-property config mapping with declarative template rules,
//!   built-in derivation functions and semantic-similarity fallback
//! - Single Message Transform (SMT) / predicate classification

pub mod connection;
pub mod mapping;
pub mod matching;
pub mod template;
pub mod transforms;

// Re-export commonly used types
pub use connection::{
    DatabaseType, JdbcConnectionInfo, MongoConnectionInfo, RedisConnectionInfo,
    ServiceBusConnectionInfo, detect_database_type, parse_jdbc_url,
    parse_mongodb_connection_string, parse_redis_url, parse_servicebus_connection_string,
};
pub use mapping::{
    ConfigMapper, ConnectorConfig, DerivationContext, DerivationRegistry, MappingOutcome,
    normalize_configs,
};
pub use matching::{
    EmbeddingProvider, MatchKind, MatchResult, MatcherConfig, PropertyDescriptor, PropertyMatcher,
    SimilarityScorer,
};
pub use template::{
    ConnectorRule, ConnectorType, DebeziumVersion, EmptySmTemplateStore, FirstMatchSelector,
    FmTemplate, RuleKind, SmProperty, SmTemplate, SmTemplateStore, StaticSmTemplateStore,
    TemplateCandidate, TemplateConfigDef, TemplateEntry, TemplateError, TemplateRepository,
    TemplateResult, TemplateSelector,
};
pub use transforms::{
    EmptyTransformCatalog, FileTransformCatalog, StaticTransformCatalog, TransformCatalog,
    TransformClassification, classify_transforms,
};
