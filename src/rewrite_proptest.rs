//! Property-based tests for path substitution and the serialized codec.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::rewrite::{
        occurrences, rewrite, rewrite_str, rewrite_structured, structured_occurrences,
        SubstitutionRule,
    };
    use crate::serialized::{decode, encode, Key, Value};
    use proptest::prelude::*;

    fn root() -> impl Strategy<Value = String> {
        "(/[a-z]{1,6}){1,3}"
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z/ .:]{0,24}".prop_map(|s| Value::String(s.into_bytes())),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Sequence),
                prop::collection::vec(("[a-z_]{1,8}", inner), 0..6).prop_map(|entries| {
                    Value::Mapping(
                        entries
                            .into_iter()
                            .enumerate()
                            // Distinct keys; a mapping never repeats one.
                            .map(|(i, (k, v))| {
                                (Key::String(format!("{}{}", k, i).into_bytes()), v)
                            })
                            .collect(),
                    )
                }),
            ]
        })
    }

    // ============================================================================
    // rewrite property tests
    // ============================================================================

    proptest! {
        /// Property: an identity rule never changes anything
        #[test]
        fn rewrite_identity_is_noop(content in ".*", from in root()) {
            let rule = SubstitutionRule::new(from.clone(), from);
            prop_assert_eq!(rewrite(content.as_bytes(), &rule), content.as_bytes().to_vec());
        }

        /// Property: after a rewrite to an unrelated root, the old root no
        /// longer occurs
        #[test]
        fn rewrite_removes_every_occurrence(
            segments in prop::collection::vec("[A-Z =]{0,10}", 1..6),
            from in root(),
        ) {
            let content = segments.join(&from);
            let rule = SubstitutionRule::new(from.clone(), "/TARGET/ENV");
            let out = rewrite(content.as_bytes(), &rule);
            prop_assert_eq!(occurrences(&out, from.as_bytes()), 0);
        }

        /// Property: the output length grows by exactly the length difference
        /// per occurrence
        #[test]
        fn rewrite_length_accounts_for_every_occurrence(
            content in "[a-z/]{0,64}",
            from in root(),
            to in root(),
        ) {
            let rule = SubstitutionRule::new(from.clone(), to.clone());
            let count = occurrences(content.as_bytes(), from.as_bytes()) as i64;
            let out = rewrite(content.as_bytes(), &rule);
            let expected = content.len() as i64 + count * (to.len() as i64 - from.len() as i64);
            prop_assert_eq!(out.len() as i64, expected);
        }

        /// Property: the byte and string rewrites agree
        #[test]
        fn rewrite_str_agrees_with_bytes(content in ".*", from in root(), to in root()) {
            let rule = SubstitutionRule::new(from, to);
            prop_assert_eq!(
                rewrite_str(&content, &rule).into_bytes(),
                rewrite(content.as_bytes(), &rule)
            );
        }

        /// Property: cloning A to B then B to C equals cloning A to C when
        /// neither of A and B contains the other
        #[test]
        fn rewrite_is_transitive(
            segments in prop::collection::vec("[A-Z =]{0,10}", 1..6),
            a in root(),
            b in root(),
            c in root(),
        ) {
            prop_assume!(!a.contains(&b) && !b.contains(&a));
            let content = segments.join(&a);
            let ab = SubstitutionRule::new(a.clone(), b.clone());
            let bc = SubstitutionRule::new(b, c.clone());
            let ac = SubstitutionRule::new(a, c);
            let two_hops = rewrite(&rewrite(content.as_bytes(), &ab), &bc);
            prop_assert_eq!(two_hops, rewrite(content.as_bytes(), &ac));
        }
    }

    // ============================================================================
    // serialized codec property tests
    // ============================================================================

    proptest! {
        /// Property: encoding then decoding yields the same value
        #[test]
        fn codec_round_trips(value in value()) {
            let bytes = encode(&value);
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(encode(&decoded), bytes);
        }

        /// Property: structural rewrite keeps the shape and the keys
        #[test]
        fn structured_rewrite_keeps_shape(value in value(), from in root(), to in root()) {
            let rule = SubstitutionRule::new(from.clone(), to);
            let rewritten = rewrite_structured(value.clone(), &rule);
            prop_assert_eq!(shape(&rewritten), shape(&value));
            if structured_occurrences(&value, from.as_bytes()) == 0 {
                prop_assert_eq!(rewritten, value);
            }
        }

        /// Property: decoding arbitrary bytes never panics
        #[test]
        fn decode_never_panics(input in prop::collection::vec(any::<u8>(), 0..128)) {
            let _ = decode(&input);
        }
    }

    /// Variant tags, container lengths and mapping keys, ignoring string
    /// contents.
    fn shape(value: &Value) -> String {
        match value {
            Value::Null => "N".to_string(),
            Value::Bool(_) => "b".to_string(),
            Value::Int(_) => "i".to_string(),
            Value::Float(_) => "d".to_string(),
            Value::String(_) => "s".to_string(),
            Value::Sequence(items) => {
                let inner: Vec<String> = items.iter().map(shape).collect();
                format!("[{}]", inner.join(","))
            }
            Value::Mapping(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}={}", k, shape(v)))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }
}
