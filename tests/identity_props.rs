use ferrous_lifecycle::{Blueprint, ComponentType, LifecycleEngine, PropertySpec, PropertyValues, Resolver, Scope, Shared};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Default)]
struct Node {
    next: Option<Shared<Node>>,
}

fn node_type() -> ComponentType {
    ComponentType::builder::<Node>()
        .reference("next", |n: &mut Node, next: Shared<Node>| n.next = Some(next))
        .build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any ring of singletons resolves, and every node points at the one
    /// instance cached under the next name.
    #[test]
    fn singleton_rings_close(len in 1usize..8, start in 0usize..8) {
        let engine = LifecycleEngine::new();
        for i in 0..len {
            engine
                .register(
                    &format!("n{}", i),
                    Blueprint::new(node_type()).with_reference("next", &format!("n{}", (i + 1) % len)),
                )
                .unwrap();
        }

        let first = format!("n{}", start % len);
        engine.get_bean(&first).unwrap();

        for i in 0..len {
            let node = engine.get_bean_as::<Node>(&format!("n{}", i)).unwrap();
            let next = engine.get_bean_as::<Node>(&format!("n{}", (i + 1) % len)).unwrap();
            prop_assert!(Arc::ptr_eq(node.read().next.as_ref().unwrap(), &next));
        }
    }

    /// Repeated singleton lookups are identical; prototype lookups never are.
    #[test]
    fn scope_identity(lookups in 2usize..10, prototype in any::<bool>()) {
        let scope = if prototype { Scope::Prototype } else { Scope::Singleton };
        let engine = LifecycleEngine::new();
        engine.register("node", Blueprint::new(node_type()).with_scope(scope)).unwrap();

        let instances: Vec<_> = (0..lookups).map(|_| engine.get_bean("node").unwrap()).collect();
        for pair in instances.windows(2) {
            prop_assert_eq!(Arc::ptr_eq(&pair[0], &pair[1]), !prototype);
        }
    }

    /// Adding a spec keeps names unique and the last value wins, in first-seen order.
    #[test]
    fn property_values_stay_unique(ops in proptest::collection::vec((0u8..5, any::<i64>()), 0..32)) {
        let mut values = PropertyValues::new();
        let mut expected: Vec<(String, i64)> = Vec::new();
        for (key, value) in ops {
            let name = format!("p{}", key);
            values.add(PropertySpec::literal(name.clone(), value));
            match expected.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value,
                None => expected.push((name, value)),
            }
        }

        let actual: Vec<(String, i64)> = values
            .iter()
            .map(|spec| match &spec.value {
                ferrous_lifecycle::PropertyValue::Literal(ferrous_lifecycle::Literal::Int(v)) => (spec.name.clone(), *v),
                other => panic!("unexpected value {:?}", other),
            })
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
