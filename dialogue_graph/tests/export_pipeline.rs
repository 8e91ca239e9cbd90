use dialogue_graph::codec::{json, script};
use dialogue_graph::{EngineConfig, FileStore, GraphError, InteractionService, IssueKind, MemoryStore};
use dialogue_model::{ChoiceOption, ChoiceSlot, Interaction};

const SCRIPT: &str = "\
title: START
---
display: Village Gate
tags: act1
===
Guard: Halt! State your business.
-> I'm here to trade.
    <<jump MARKET>>
-> Just passing through.
    <<jump ROAD>>
===

title: MARKET
---
===
Merchant: Fresh bread, cheap!
<<jump ROAD>>
===

title: ROAD
---
===
: The road stretches on: endless.
-> Keep walking.
===
";

fn file_service(dir: &std::path::Path) -> InteractionService<FileStore> {
    let mut config = EngineConfig::default();
    config.storage.data_dir = dir.join("interactions");
    let store = FileStore::open(&config.storage.data_dir).unwrap();
    InteractionService::with_config(store, config).unwrap()
}

#[test]
fn test_script_to_store_to_engine_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = file_service(dir.path());

    let imported = script::parse_all(SCRIPT);
    assert_eq!(imported.len(), 3);
    for interaction in &imported {
        service.save(interaction).unwrap();
    }

    let parents: Vec<_> = service
        .get_parents("ROAD")
        .into_iter()
        .map(|link| (link.parent_id, link.slot))
        .collect();
    assert!(parents.contains(&("START".to_string(), ChoiceSlot::Choice(1))));
    assert!(parents.contains(&("MARKET".to_string(), ChoiceSlot::Fallthrough)));

    let out = dir.path().join("dialogue.json");
    assert_eq!(service.export_json(&out).unwrap(), 3);

    let nodes = json::from_file(&out).unwrap();
    let road = nodes.iter().find(|node| node.id == "ROAD").unwrap();
    assert_eq!(road.line.as_deref(), Some("The road stretches on: endless."));
    assert_eq!(road.choices.as_ref().unwrap()[0].target_node, "END");
    assert!(json::validate_nodes(&nodes).is_valid());

    let rendered = script::render_all(&json::from_nodes(&nodes));
    let reparsed = script::parse_all(&rendered);
    let ids: Vec<_> = reparsed.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["MARKET", "ROAD", "START"]);
}

#[test]
fn test_index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut service = file_service(dir.path());
        for interaction in script::parse_all(SCRIPT) {
            service.save(&interaction).unwrap();
        }
    }

    let service = file_service(dir.path());
    let path: Vec<_> = service
        .dialogue_path("MARKET")
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(path, vec!["START", "MARKET"]);
    assert_eq!(
        service.get_choice_text_for_transition("START", "MARKET").unwrap().as_deref(),
        Some("I'm here to trade.")
    );
}

#[test]
fn test_export_refuses_broken_graph() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = InteractionService::new(MemoryStore::new()).unwrap();

    service
        .save(
            &Interaction::new("START")
                .with_line(Some("Guard"), "Halt!")
                .with_choices(vec![ChoiceOption::new("Onward", "NOWHERE")]),
        )
        .unwrap();

    let out = dir.path().join("dialogue.json");
    match service.export_json(&out) {
        Err(GraphError::InvalidExport { errors }) => {
            assert!(errors.iter().any(|issue| issue.kind == IssueKind::BrokenReference));
        }
        other => panic!("expected refused export, got {:?}", other),
    }
    assert!(!out.exists());
}

#[test]
fn test_cycle_is_reported_but_exportable() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = InteractionService::new(MemoryStore::new()).unwrap();

    service
        .save(&Interaction::new("START").with_line(None, "Begin").with_next("LOOP_A"))
        .unwrap();
    service
        .save(&Interaction::new("LOOP_A").with_line(None, "Again?").with_next("LOOP_B"))
        .unwrap();
    service
        .save(
            &Interaction::new("LOOP_B")
                .with_line(None, "Once more")
                .with_choices(vec![
                    ChoiceOption::new("Yes", "LOOP_A"),
                    ChoiceOption::dead_end("No"),
                ]),
        )
        .unwrap();

    let result = service.validate().unwrap();
    assert!(result.is_valid());
    let cycles = result.cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_path, "LOOP_A → LOOP_B → LOOP_A");

    let out = dir.path().join("dialogue.json");
    assert_eq!(service.export_json(&out).unwrap(), 3);
}
