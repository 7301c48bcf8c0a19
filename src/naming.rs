//! Deterministic unique ids for construct paths.
//!
//! Logical ids, export names and artifact ids are all derived from construct
//! paths with [`make_unique_id`]. A single-component path keeps its readable
//! name; longer paths get a human-readable prefix plus an 8-character hash of
//! the full path so that distinct paths never collide.

use sha2::{Digest, Sha256};

use crate::constants::{
    HIDDEN_FROM_HUMAN_ID, HIDDEN_ID, ID_HASH_LENGTH, MAX_HUMAN_ID_LENGTH, MAX_ID_LENGTH,
    PATH_SEPARATOR,
};
use crate::core::{Result, StackrefError};
use crate::tokens::is_unresolved;

/// Compute a unique id for a path of construct ids.
///
/// # Errors
///
/// - [`StackrefError::EmptyIdComponents`] when nothing is left after dropping
///   `Default` components
/// - [`StackrefError::UnresolvedIdComponent`] when a component is a placeholder
pub fn make_unique_id<S: AsRef<str>>(components: &[S]) -> Result<String> {
    let components: Vec<&str> =
        components.iter().map(AsRef::as_ref).filter(|c| *c != HIDDEN_ID).collect();

    if components.is_empty() {
        return Err(StackrefError::EmptyIdComponents);
    }

    if components.iter().any(|c| is_unresolved(c)) {
        return Err(StackrefError::UnresolvedIdComponent {
            components: components.join(PATH_SEPARATOR),
        });
    }

    // top-level ids are kept readable so hand-written templates migrate unchanged
    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);
        if candidate.len() <= MAX_ID_LENGTH {
            return Ok(candidate);
        }
    }

    let hash = path_hash(&components);
    let mut human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();
    human.truncate(MAX_HUMAN_ID_LENGTH);

    Ok(human + &hash)
}

/// Strip every character outside `[A-Za-z0-9]`.
#[must_use]
pub fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join(PATH_SEPARATOR).as_bytes());
    hex::encode_upper(digest)[..ID_HASH_LENGTH].to_string()
}

/// Drop components that merely repeat the end of the previous one.
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::with_capacity(components.len());
    for component in components {
        if out.last().is_none_or(|last| !last.ends_with(component)) {
            out.push(component);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component_is_readable() {
        assert_eq!(make_unique_id(&["My-Bucket"]).unwrap(), "MyBucket");
        assert_eq!(
            make_unique_id(&["reference-to-ParentBucketAB12CD34.Ref"]).unwrap(),
            "referencetoParentBucketAB12CD34Ref"
        );
    }

    #[test]
    fn test_multi_component_has_hash() {
        let id = make_unique_id(&["Stack", "Bucket"]).unwrap();
        assert!(id.starts_with("StackBucket"));
        assert_eq!(id.len(), "StackBucket".len() + ID_HASH_LENGTH);
        assert!(id[id.len() - ID_HASH_LENGTH..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_paths_do_not_collide() {
        // both strip to the same human part
        let a = make_unique_id(&["Stack", "a-b"]).unwrap();
        let b = make_unique_id(&["Stack", "ab"]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hidden_components() {
        let with_default = make_unique_id(&["Stack", "Bucket", "Default"]).unwrap();
        let without = make_unique_id(&["Stack", "Bucket"]).unwrap();
        assert_eq!(with_default, without);

        let resource = make_unique_id(&["Stack", "Bucket", "Resource"]).unwrap();
        assert!(resource.starts_with("StackBucket"));
        assert!(!resource.contains("Resource"));
    }

    #[test]
    fn test_dupes_removed_from_human_part() {
        let id = make_unique_id(&["Bucket", "Bucket"]).unwrap();
        assert!(id.starts_with("Bucket"));
        assert_eq!(id.len(), "Bucket".len() + ID_HASH_LENGTH);
    }

    #[test]
    fn test_errors() {
        let empty: [&str; 0] = [];
        assert!(matches!(make_unique_id(&empty), Err(StackrefError::EmptyIdComponents)));
        assert!(matches!(make_unique_id(&["Default"]), Err(StackrefError::EmptyIdComponents)));
        assert!(matches!(
            make_unique_id(&["Stack", "${AWS::StackName}"]),
            Err(StackrefError::UnresolvedIdComponent { .. })
        ));
    }

    #[test]
    fn test_is_deterministic() {
        let a = make_unique_id(&["Exports", "Output{\"Ref\":\"Bucket\"}"]).unwrap();
        let b = make_unique_id(&["Exports", "Output{\"Ref\":\"Bucket\"}"]).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("ExportsOutputRefBucket"));
    }
}
