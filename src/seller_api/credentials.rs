use std::fs;
use std::path::Path;

use crate::error::{ToolkitError, ToolkitResult};

/// One seller account: `Client-Id` and `Api-Key` header values
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"***")
            .finish()
    }
}

/// Read `client_id;api_key` pairs, one per line
pub fn load_credentials(path: &Path) -> ToolkitResult<Vec<ApiCredentials>> {
    let content = fs::read_to_string(path)?;
    parse_credentials(&content, path)
}

pub fn parse_credentials(content: &str, path: &Path) -> ToolkitResult<Vec<ApiCredentials>> {
    let invalid = |line: usize, reason: &str| ToolkitError::InvalidCredentials {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    };

    let mut credentials = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (client_id, api_key) = line
            .split_once(';')
            .ok_or_else(|| invalid(idx + 1, "expected client_id;api_key"))?;
        let (client_id, api_key) = (client_id.trim(), api_key.trim());
        if client_id.is_empty() || api_key.is_empty() {
            return Err(invalid(idx + 1, "client_id and api_key must both be set"));
        }
        credentials.push(ApiCredentials {
            client_id: client_id.to_string(),
            api_key: api_key.to_string(),
        });
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let content = "# seller accounts\n\n 1111 ; key-a \n2222;key;with;semicolons\n";
        let parsed = parse_credentials(content, Path::new("apis.txt")).unwrap();
        assert_eq!(
            parsed,
            vec![
                ApiCredentials {
                    client_id: "1111".into(),
                    api_key: "key-a".into()
                },
                ApiCredentials {
                    client_id: "2222".into(),
                    api_key: "key;with;semicolons".into()
                },
            ]
        );
    }

    #[test]
    fn reports_line_number_of_malformed_entry() {
        let err = parse_credentials("1;a\nno-separator\n", Path::new("apis.txt")).unwrap_err();
        match err {
            ToolkitError::InvalidCredentials { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse_credentials(" ;key\n", Path::new("apis.txt")).is_err());
    }

    #[test]
    fn debug_output_hides_api_key() {
        let creds = ApiCredentials {
            client_id: "42".into(),
            api_key: "secret".into(),
        };
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
