//! Connection string parsing for connector configurations
//!
//! This module provides stateless parsers that extract host/port/database
//! and credential details from the connection settings self-managed
//! connectors carry:
//! - JDBC URLs, including the Oracle `(DESCRIPTION=...)` descriptor form
//! - MongoDB connection strings (`mongodb://` and `mongodb+srv://`)
//! - Redis URLs (`redis://` and `rediss://`)
//! - Azure Service Bus connection strings
//!
//! Malformed input never raises: parsers return partial results and simply
//! leave absent fields unset.

mod jdbc;
mod mongodb;
mod redis;
mod servicebus;

pub use jdbc::{DatabaseType, JdbcConnectionInfo, detect_database_type, parse_jdbc_url};
pub use mongodb::{MongoConnectionInfo, parse_mongodb_connection_string};
pub use redis::{RedisConnectionInfo, parse_redis_url};
pub use servicebus::{ServiceBusConnectionInfo, parse_servicebus_connection_string};
