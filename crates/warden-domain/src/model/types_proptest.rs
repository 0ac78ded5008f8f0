//! Property-based tests for model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{ObjectKind, ObjectRef, Relation};

    fn kind_strategy() -> impl Strategy<Value = ObjectKind> {
        proptest::sample::select(ObjectKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn test_object_parse_roundtrip(kind in kind_strategy(), id in "[a-zA-Z0-9_-]{1,26}") {
            let input = format!("{kind}:{id}");
            let parsed = ObjectRef::parse(&input);
            prop_assert!(parsed.is_ok(), "Failed for object: {}", input);
            let obj = parsed.unwrap();
            prop_assert_eq!(obj.kind, kind);
            prop_assert_eq!(obj.to_string(), input);
        }

        #[test]
        fn test_object_without_colon_is_invalid(s in "[a-z_]{1,20}") {
            prop_assert!(ObjectRef::parse(&s).is_err(), "Should reject: {}", s);
        }

        #[test]
        fn test_id_may_contain_colons(id in "[a-z0-9]{1,8}:[a-z0-9]{1,8}") {
            let obj = ObjectRef::parse(&format!("file:{id}")).unwrap();
            prop_assert_eq!(obj.id, id);
        }

        #[test]
        fn test_every_relation_satisfies_itself(
            relation in proptest::sample::select(Relation::ALL.to_vec())
        ) {
            prop_assert!(relation.satisfied_by().contains(&relation));
        }
    }
}
