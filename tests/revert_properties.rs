//! Property tests for reverting tracked replacements.
//!
//! Whatever sequence of `replace_node` calls runs over a tree, `revert_all`
//! must bring back the exact original markup and leave nothing tracked.

use proptest::prelude::*;
use vocab_swap::{ConfigUpdate, Engine, NodeId, TermTarget, TextTree, Vocabulary};

const WORDS: &[&str] = &["cat", "cater", "tea", "the", "Cat", "12", "x", "caterpillar", "猫"];

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..8).prop_map(|words| words.join(" "))
}

fn engine(numbers: bool) -> Engine {
    let mut engine = Engine::immediate();
    let vocab: Vocabulary = [
        ("cat", TermTarget::new("猫")),
        ("cater", TermTarget::new("承办")),
        ("tea", TermTarget::new("茶").with_pronunciation("chá")),
        ("caterpillar", TermTarget::new("毛毛虫")),
    ]
    .into_iter()
    .collect();
    engine.set_vocabulary(&vocab, Vec::<String>::new());
    engine.update_config(ConfigUpdate::new().numbers_replacement(numbers));
    engine
}

fn build_tree(texts: &[String]) -> (TextTree, Vec<NodeId>) {
    let mut tree = TextTree::new();
    let root = tree.root();
    let mut units = Vec::new();
    for text in texts {
        let p = tree.create_element("p");
        let t = tree.create_text(text);
        tree.append_child(p, t);
        tree.append_child(root, p);
        units.push(t);
    }
    (tree, units)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn revert_all_restores_markup(
        texts in prop::collection::vec(arb_text(), 1..6),
        order in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
        numbers in any::<bool>(),
    ) {
        let mut engine = engine(numbers);
        let (mut tree, units) = build_tree(&texts);
        let before = tree.to_markup(tree.root());
        let live = tree.live_count();

        for index in &order {
            let unit = units[index.index(units.len())];
            engine.replace_node(&mut tree, unit);
        }

        engine.revert_all(&mut tree);
        prop_assert_eq!(tree.to_markup(tree.root()), before);
        prop_assert_eq!(tree.live_count(), live);
        prop_assert_eq!(engine.tracked_count(), 0);
    }

    #[test]
    fn replace_node_value_matches_replace(text in arb_text(), numbers in any::<bool>()) {
        let mut engine = engine(numbers);
        let (mut tree, units) = build_tree(std::slice::from_ref(&text));

        let expected = engine.replace(&text);
        let applied = engine.replace_node(&mut tree, units[0]);
        prop_assert_eq!(&applied, &expected);
        prop_assert_eq!(tree.text_content(tree.root()), expected.value);
    }
}
