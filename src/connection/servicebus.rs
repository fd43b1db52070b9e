//! Azure Service Bus connection string parsing

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ENDPOINT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Endpoint=sb://([^.]+)\.servicebus\.windows\.net/").unwrap());
static SAS_KEY_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SharedAccessKeyName=([^;]+)").unwrap());
static SAS_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"SharedAccessKey=([^;]+)").unwrap());
static ENTITY_PATH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"EntityPath=([^;]+)").unwrap());

/// Details extracted from an Azure Service Bus connection string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBusConnectionInfo {
    pub namespace: Option<String>,
    pub sas_key_name: Option<String>,
    pub sas_key: Option<String>,
    pub entity_path: Option<String>,
}

/// Parse an Azure Service Bus connection string of the form
/// `Endpoint=sb://<ns>.servicebus.windows.net/;SharedAccessKeyName=..;SharedAccessKey=..;EntityPath=..`.
pub fn parse_servicebus_connection_string(connection_string: &str) -> ServiceBusConnectionInfo {
    let mut info = ServiceBusConnectionInfo::default();

    if let Some(caps) = ENDPOINT_REGEX.captures(connection_string) {
        info.namespace = Some(caps[1].to_string());
    }
    if let Some(caps) = SAS_KEY_NAME_REGEX.captures(connection_string) {
        info.sas_key_name = Some(caps[1].to_string());
    }
    if let Some(caps) = SAS_KEY_REGEX.captures(connection_string) {
        info.sas_key = Some(caps[1].to_string());
    }
    if let Some(caps) = ENTITY_PATH_REGEX.captures(connection_string) {
        info.entity_path = Some(caps[1].to_string());
    }

    info
}
