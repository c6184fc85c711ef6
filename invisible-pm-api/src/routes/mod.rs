/// API route handlers, one module per resource
///
/// Every handler under `/v1` (except `auth`) runs behind the JWT layer and
/// receives an `Extension<AuthContext>`; permission checks happen in the
/// handler, before any query that could leak data across workspaces.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod integrations;
pub mod me;
pub mod projects;
pub mod tasks;
pub mod time_entries;
pub mod users;
pub mod workspaces;

use serde::{Deserialize, Deserializer};

/// Tells a missing field (`None`) apart from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        rate: Option<Option<u32>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"rate": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"rate": 40}"#).unwrap();

        assert_eq!(absent.rate, None);
        assert_eq!(cleared.rate, Some(None));
        assert_eq!(set.rate, Some(Some(40)));
    }
}
