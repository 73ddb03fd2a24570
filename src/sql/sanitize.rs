//! Scrubbing of connection metadata before it reaches the recorder
//!
//! Connection strings carry credentials and data sources carry ports; both
//! get cleaned up here before anything is attached to a subsegment.

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing ",1433" / ":5432" style port designators on a data source
static PORT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[,:]\s*\d+\s*$").expect("port suffix pattern is valid")
});

/// Remove a trailing port designator from a data source for naming purposes
///
/// "db.example.com,1433" and "db.example.com:5432" both become
/// "db.example.com"; a bare host passes through unchanged.
pub fn strip_port(data_source: &str) -> String {
    PORT_SUFFIX.replace(data_source.trim(), "").into_owned()
}

/// Remove credential-bearing pairs from an ADO-style connection string
///
/// Drops `Password=` and `Pwd=` pairs and keeps everything else in order.
pub fn scrub_connection_string(connection_string: &str) -> String {
    connection_string
        .split(';')
        .filter(|part| !is_credential_pair(part))
        .collect::<Vec<_>>()
        .join(";")
}

/// Pull the user name out of a connection string, if present
pub fn extract_user(connection_string: &str) -> Option<String> {
    for part in connection_string.split(';') {
        let (key, value) = match part.split_once('=') {
            Some(pair) => pair,
            None => continue,
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "user id" | "uid" | "user" | "username" => {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    None
}

fn is_credential_pair(part: &str) -> bool {
    let key = part
        .split_once('=')
        .map(|(key, _)| key)
        .unwrap_or(part)
        .trim()
        .to_ascii_lowercase();

    key == "password" || key == "pwd"
}
