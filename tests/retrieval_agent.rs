//! Query-phase tests: bounded investigations against an in-memory codebase.

use chrono::Utc;
use lore::agent::{Evidence, QaSession, RetrievalAgent, Termination};
use lore::config::AgentConfig;
use lore::document::KnowledgeDocument;
use lore::models::{Abstraction, Chapter, Relationship, TraversalOrder};
use lore::reasoning::ScriptedReasoner;
use lore::store::{FileFilter, MemoryStore};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn store() -> MemoryStore {
    MemoryStore::new(
        "/work/shop",
        [
            ("src/cart.py", "class Cart:\n    def total(self): ..."),
            ("src/checkout.py", "from cart import Cart\n"),
            ("src/models/item.py", "class Item: ..."),
            ("src/models/price.py", "class Price: ..."),
            ("src/models/tax.py", "RATE = 0.2"),
            ("src/models/user.py", "class User: ..."),
        ],
        &FileFilter::default(),
    )
    .unwrap()
}

fn document() -> KnowledgeDocument {
    KnowledgeDocument {
        project: "shop".to_string(),
        generated_at: Utc::now(),
        fingerprint: "f".to_string(),
        files: store_paths(),
        summary: "A shopping cart with a checkout step.".to_string(),
        abstractions: vec![
            Abstraction {
                name: "Cart".to_string(),
                description: "Holds items.".to_string(),
                file_indices: BTreeSet::from([0]),
                entry_point: false,
            },
            Abstraction {
                name: "Checkout".to_string(),
                description: "Charges the user.".to_string(),
                file_indices: BTreeSet::from([1]),
                entry_point: false,
            },
        ],
        relationships: vec![Relationship {
            from: 1,
            to: 0,
            label: "Totals".to_string(),
        }],
        order: TraversalOrder::new(vec![0, 1]).unwrap(),
        chapters: vec![
            Chapter {
                abstraction_index: 0,
                sequence_number: 1,
                content: "The cart sums item prices.".to_string(),
            },
            Chapter {
                abstraction_index: 1,
                sequence_number: 2,
                content: "Checkout asks the cart for its total.".to_string(),
            },
        ],
    }
}

fn store_paths() -> Vec<String> {
    use lore::store::FileStore;
    store().list().iter().map(|f| f.path.clone()).collect()
}

fn config(max_rounds: usize) -> AgentConfig {
    AgentConfig {
        max_rounds,
        ..AgentConfig::default()
    }
}

#[test]
fn test_missing_file_is_reported_back() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts([
        "[REQUEST_FILE: missing.py]",
        "There is no missing.py; the cart lives in src/cart.py.",
    ]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));

    let answer = agent.investigate("What is in missing.py?", &[]).unwrap();
    assert_eq!(answer.termination, Termination::Answered);
    assert!(answer.consulted_files.is_empty());
    assert!(stub.prompts()[1].contains("FileNotFound: missing.py"));
    assert!(matches!(&answer.evidence[0], Evidence::NotFound { path } if path == "missing.py"));
}

#[test]
fn test_duplicate_request_forces_an_answer() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts([
        "[REQUEST_FILE: src/cart.py]",
        "[REQUEST_FILE: ./src/cart.py]",
        "Cart.total adds up the items.",
    ]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));

    let answer = agent.investigate("How is the total computed?", &[]).unwrap();
    assert_eq!(answer.calls, 3);
    assert_eq!(answer.termination, Termination::DuplicateRequest);
    assert!(answer.is_partial());
    assert_eq!(answer.consulted_files, vec!["src/cart.py"]);
    assert_eq!(answer.text, "Cart.total adds up the items.");

    let prompts = stub.prompts();
    assert!(!prompts[1].contains("cannot request any more files"));
    assert!(prompts[2].contains("cannot request any more files"));
}

#[test]
fn test_oscillating_requests_stop_at_the_first_repeat() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts([
        "[REQUEST_FILE: src/cart.py]",
        "[REQUEST_FILE: src/checkout.py]",
        "[REQUEST_FILE: src/cart.py]",
        "[REQUEST_FILE: src/checkout.py]",
        "Done.",
    ]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));

    let answer = agent.investigate("q", &[]).unwrap();
    assert_eq!(answer.calls, 4);
    assert_eq!(answer.termination, Termination::DuplicateRequest);
    assert_eq!(answer.consulted_files, vec!["src/cart.py", "src/checkout.py"]);
    // The final call still asked for a file; the agent answers anyway
    assert!(!answer.text.contains("REQUEST_FILE"));
}

#[test]
fn test_endless_requests_are_cut_off() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_fn(|_, call| Ok(format!("[REQUEST_FILE: src/file{call}.py]")));
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(3));

    let answer = agent.investigate("q", &[]).unwrap();
    assert_eq!(answer.calls, 4);
    assert_eq!(stub.calls(), 4);
    assert_eq!(answer.termination, Termination::RoundsExhausted);
    assert!(answer.caveat().unwrap().contains("cut short"));
}

#[test]
fn test_glob_request_is_capped() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts(["[REQUEST_FILE: src/models/*.py]", "Four models."]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));

    let answer = agent.investigate("Which models exist?", &[]).unwrap();
    assert_eq!(answer.consulted_files.len(), 3);
    let second = &stub.prompts()[1];
    assert!(second.contains("(1 more files matched but were not included)"));
    assert!(second.contains("class Item"));
}

#[test]
fn test_session_keeps_answers_not_file_contents() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts([
        "[REQUEST_FILE: src/models/tax.py]",
        "Tax is 20 percent.",
        "It is applied at checkout.",
    ]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));
    let mut session = QaSession::new(agent);

    session.ask("What is the tax rate?").unwrap();
    session.ask("Where is it applied?").unwrap();

    let last = stub.prompts().pop().unwrap();
    assert!(last.contains("User: What is the tax rate?"));
    assert!(last.contains("Assistant: Tax is 20 percent."));
    assert!(!last.contains("RATE = 0.2"));
    assert_eq!(session.history().len(), 4);
}

#[test]
fn test_knowledge_document_is_in_every_prompt() {
    let (doc, store) = (document(), store());
    let stub = ScriptedReasoner::from_texts(["[REQUEST_FILE: src/cart.py]", "ok"]);
    let agent = RetrievalAgent::new(&stub, &store, &doc, config(5));
    agent.investigate("cart?", &[]).unwrap();
    for prompt in stub.prompts() {
        assert!(prompt.contains("A shopping cart with a checkout step."));
        assert!(prompt.contains("src/models/user.py"));
    }
}

proptest! {
    #[test]
    fn prop_calls_never_exceed_rounds_plus_one(
        max_rounds in 0usize..6,
        script in prop::collection::vec(prop::option::of(0usize..8), 0..12),
    ) {
        let (doc, store) = (document(), store());
        let stub = ScriptedReasoner::from_fn(move |_, call| {
            Ok(match script.get(call).copied().flatten() {
                Some(n) if n < 6 => format!("[REQUEST_FILE: {}]", store_paths()[n]),
                Some(n) => format!("[REQUEST_FILE: nowhere/{n}.py]"),
                None if call < script.len() => "An answer.".to_string(),
                None => "[REQUEST_FILE: src/cart.py]".to_string(),
            })
        });
        let agent = RetrievalAgent::new(&stub, &store, &doc, config(max_rounds));
        let answer = agent.investigate("q", &[]).unwrap();

        prop_assert!(answer.calls <= max_rounds + 1);
        prop_assert_eq!(answer.calls, stub.calls());
        prop_assert!(answer.consulted_files.len() <= max_rounds * 3);
        let unique: BTreeSet<_> = answer.consulted_files.iter().collect();
        prop_assert_eq!(unique.len(), answer.consulted_files.len());
        prop_assert!(!answer.text.is_empty());
    }
}
