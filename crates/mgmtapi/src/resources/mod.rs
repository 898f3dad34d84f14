//! Reconcilers for the management API resource kinds.
//!
//! | kind     | collection              | instance                       |
//! |----------|-------------------------|--------------------------------|
//! | `client` | `/api/v2/clients`       | `/api/v2/clients/{id}`         |
//! | `grant`  | `/api/v2/client-grants` | `/api/v2/client-grants/{id}` (read by `?client_id=&audience=`) |

pub mod client;
pub mod grant;

pub use client::{ApplicationClient, ClientReconciler, ClientSpec};
pub use grant::{AccessGrant, GrantReconciler, GrantSpec};

use declarative::FieldChange;
use serde::{Deserialize, Deserializer, Serialize};

/// Percent-encode one path segment or query value.
pub(crate) fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Render a value the way it appears on the wire.
fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Record a change when the remote value differs from the desired one.
pub(crate) fn compare<T>(changes: &mut Vec<FieldChange>, field: &str, remote: &T, desired: &T)
where
    T: PartialEq + Serialize + ?Sized,
{
    if remote != desired {
        changes.push(FieldChange::new(field, render(remote), render(desired)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_segment() {
        assert_eq!(encode("abc123"), "abc123");
        assert_eq!(encode("a/b c"), "a%2Fb%20c");
        assert_eq!(
            encode("https://api.example.com/"),
            "https%3A%2F%2Fapi.example.com%2F"
        );
    }

    #[test]
    fn test_compare_renders_wire_values() {
        let mut changes = Vec::new();
        compare(&mut changes, "sso", &false, &true);
        compare(&mut changes, "name", "same", "same");
        compare(
            &mut changes,
            "grant_types",
            &vec!["implicit".to_string()],
            &vec!["client_credentials".to_string()],
        );

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], FieldChange::new("sso", "false", "true"));
        assert_eq!(changes[1].from, r#"["implicit"]"#);
    }
}
