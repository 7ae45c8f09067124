//! Engine-level tests: validation, events, copy/paste and the documented
//! example scenario

use pagecraft_common::{BlockPreset, IdGenerator, PropertyField};
use pagecraft_editor::{
    Block, BlockSchema, BlockStructure, Engine, EngineConfig, EngineError, EngineEvent, EventKind, InsertOptions,
    MoveTarget, Page,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn schemas() -> Vec<BlockSchema> {
    vec![
        BlockSchema::new("box").accepting(["*"]),
        BlockSchema::new("text")
            .with_display_name("Text")
            .with_property(PropertyField::new("content", "text").with_default(json!("Hello"))),
        BlockSchema::new("row").accepting(["column"]),
        BlockSchema::new("column").accepting(["*"]),
        BlockSchema::new("slide").private(),
        BlockSchema::new("slider").accepting(["slide"]),
        BlockSchema::new("section").accepting(["@theme/*"]).with_preset(
            BlockPreset::new("Two columns")
                .with_child(BlockStructure::new("@theme/row"))
                .with_child(BlockStructure::new("@theme/row")),
        ),
        BlockSchema::new("@theme/row").accepting(["*"]),
        BlockSchema::new("broken").accepting(["*"]).with_preset(
            BlockPreset::new("Broken")
                .with_child(BlockStructure::new("text"))
                .with_child(BlockStructure::new("missing-type")),
        ),
    ]
}

fn engine() -> Engine {
    let mut config = EngineConfig::default();
    config.block_schemas = schemas();
    Engine::new(config)
        .unwrap()
        .with_id_generator(IdGenerator::from_seed("t"))
}

fn record_events(engine: &mut Engine) -> Rc<RefCell<Vec<EngineEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn test_example_scenario() {
    let mut engine = engine();
    let initial = engine.get_page();

    let box_id = engine.insert_block("box", InsertOptions::in_region("main")).unwrap();
    let text_id = engine
        .insert_block("text", InsertOptions::in_parent(box_id.clone()).at(0))
        .unwrap();
    engine
        .move_block(&text_id, MoveTarget::region("main", Some(0)))
        .unwrap();

    let page = engine.get_page();
    assert_eq!(page.regions[0].blocks, vec![text_id.clone(), box_id.clone()]);
    assert!(page.blocks[&box_id].children.is_empty());
    assert_eq!(page.blocks[&text_id].parent_id, None);

    for _ in 0..3 {
        assert!(engine.undo().unwrap());
    }
    assert_eq!(engine.get_page(), initial);
    assert!(!engine.undo().unwrap());
}

#[test]
fn test_events_carry_incremental_payloads() {
    let mut engine = engine();
    let events = record_events(&mut engine);

    let box_id = engine.insert_block("box", InsertOptions::default()).unwrap();
    let text_id = engine
        .insert_block("text", InsertOptions::in_parent(box_id.clone()))
        .unwrap();
    engine.set_block_property(&text_id, "content", json!("Bye")).unwrap();
    engine.toggle_block(&text_id, None).unwrap();
    engine.set_block_name(&text_id, "Headline").unwrap();

    let events = events.borrow();
    let kinds: Vec<EventKind> = events.iter().map(EngineEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::BlockInsert,
            EventKind::BlockInsert,
            EventKind::BlockPropertySet,
            EventKind::BlockToggle,
            EventKind::BlockUpdate,
        ]
    );

    match &events[1] {
        EngineEvent::BlockInsert {
            block_id,
            parent_id,
            region_name,
            index,
            ..
        } => {
            assert_eq!(block_id, &text_id);
            assert_eq!(parent_id.as_deref(), Some(box_id.as_str()));
            assert_eq!(region_name, &None);
            assert_eq!(*index, 0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    match &events[2] {
        EngineEvent::BlockPropertySet { value, old_value, .. } => {
            assert_eq!(value, &Some(json!("Bye")));
            assert_eq!(old_value, &Some(json!("Hello")));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_once_listener_fires_once() {
    let mut engine = engine();
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    engine.once(EventKind::BlockInsert, move |_| *sink.borrow_mut() += 1);

    engine.insert_block("box", InsertOptions::default()).unwrap();
    engine.insert_block("box", InsertOptions::default()).unwrap();

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_off_stops_delivery() {
    let mut engine = engine();
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let id = engine.on(EventKind::BlockInsert, move |_| *sink.borrow_mut() += 1);

    engine.insert_block("box", InsertOptions::default()).unwrap();
    assert!(engine.off(id));
    engine.insert_block("box", InsertOptions::default()).unwrap();

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_private_child_needs_exact_accepts() {
    let mut engine = engine();
    let boxed = engine.insert_block("box", InsertOptions::default()).unwrap();
    let slider = engine.insert_block("slider", InsertOptions::default()).unwrap();

    assert_eq!(
        engine.insert_block("slide", InsertOptions::in_parent(boxed)),
        Err(EngineError::InvalidChildType {
            child: "slide".into(),
            parent: "box".into()
        })
    );
    assert!(engine.insert_block("slide", InsertOptions::in_parent(slider)).is_ok());
}

#[test]
fn test_move_checks_acceptance() {
    let mut engine = engine();
    let row = engine.insert_block("row", InsertOptions::default()).unwrap();
    let text = engine.insert_block("text", InsertOptions::default()).unwrap();
    let before = engine.get_page();

    assert_eq!(
        engine.move_block(&text, MoveTarget::parent(row.clone(), None)),
        Err(EngineError::InvalidChildType {
            child: "text".into(),
            parent: "row".into()
        })
    );
    assert_eq!(
        engine.move_block("ghost", MoveTarget::parent(row, None)),
        Err(EngineError::BlockNotFound("ghost".into()))
    );
    assert_eq!(engine.get_page(), before);
}

#[test]
fn test_preset_with_glob_children() {
    let mut engine = engine();
    let id = engine
        .insert_block_from_preset("section", 0, InsertOptions::default())
        .unwrap();

    let section = engine.get_block_by_id(&id).unwrap();
    assert_eq!(section.name.as_deref(), Some("Two columns"));
    assert_eq!(section.children.len(), 2);
    for child in &section.children {
        let child = engine.get_block_by_id(child).unwrap();
        assert_eq!(child.block_type, "@theme/row");
        assert_eq!(child.parent_id.as_deref(), Some(id.as_str()));
    }
    assert!(engine.get_page().check_integrity().is_empty());
}

#[test]
fn test_preset_insertion_is_atomic() {
    let mut engine = engine();
    let before = engine.get_page();

    assert_eq!(
        engine.insert_block_from_preset("broken", 0, InsertOptions::default()),
        Err(EngineError::BlockTypeNotRegistered("missing-type".into()))
    );
    assert_eq!(engine.get_page(), before);
    assert!(!engine.can_undo());
}

#[test]
fn test_copy_paste_round_trip() {
    let mut engine = engine();
    let column = engine.insert_block("column", InsertOptions::default()).unwrap();
    let text = engine
        .insert_block("text", InsertOptions::in_parent(column.clone()))
        .unwrap();
    engine.set_block_property(&text, "content", json!("Copied")).unwrap();
    engine.set_block_name(&column, "Left").unwrap();

    let structure = engine.export_block_as_nested_structure(&column).unwrap();
    assert_eq!(structure.id.as_deref(), Some(column.as_str()));
    assert_eq!(structure.children.len(), 1);
    assert_eq!(structure.children[0].properties["content"], json!("Copied"));

    let pasted = engine.paste_block(&structure, InsertOptions::default()).unwrap();
    assert_ne!(pasted, column);

    let copy = engine.get_block_by_id(&pasted).unwrap();
    assert_eq!(copy.name.as_deref(), Some("Left"));
    assert_eq!(copy.semantic_id.as_deref(), Some(column.as_str()));

    let copied_text = engine.get_block_by_id(&copy.children[0]).unwrap();
    assert_eq!(copied_text.properties["content"], json!("Copied"));
    assert_eq!(copied_text.name.as_deref(), Some("Text"));
    assert_eq!(
        engine.get_page().regions[0].blocks,
        vec![column.clone(), pasted.clone()]
    );
}

#[test]
fn test_paste_after_sibling() {
    let mut engine = engine();
    let column = engine.insert_block("column", InsertOptions::default()).unwrap();
    let first = engine
        .insert_block("text", InsertOptions::in_parent(column.clone()))
        .unwrap();
    let last = engine
        .insert_block("text", InsertOptions::in_parent(column.clone()))
        .unwrap();

    let structure = engine.export_block_as_nested_structure(&last).unwrap();
    assert!(engine.can_paste_after(&structure, &first));

    let pasted = engine.paste_block_after(&structure, &first).unwrap();
    let children = engine.get_block_by_id(&column).unwrap().children;
    assert_eq!(children, vec![first, pasted, last]);
}

#[test]
fn test_paste_after_rejects_static_parent_and_bad_type() {
    let mut engine = engine();
    let frozen = BlockStructure::new("box")
        .static_block()
        .with_child(BlockStructure::new("text"));
    let frozen_id = engine.paste_block(&frozen, InsertOptions::default()).unwrap();
    let inner = engine.get_block_by_id(&frozen_id).unwrap().children[0].clone();

    let text = BlockStructure::new("text");
    assert!(!engine.can_paste_after(&text, &inner));
    assert_eq!(
        engine.paste_block_after(&text, &inner),
        Err(EngineError::StaticBlock(frozen_id.clone()))
    );

    let row = engine.insert_block("row", InsertOptions::default()).unwrap();
    let column = engine
        .insert_block("column", InsertOptions::in_parent(row))
        .unwrap();
    assert!(!engine.can_paste_after(&text, &column));
    assert!(engine.can_paste_after(&text, &frozen_id));
}

#[test]
fn test_set_page_emits_snapshots() {
    let mut engine = engine();
    engine.insert_block("box", InsertOptions::default()).unwrap();
    let events = record_events(&mut engine);
    let previous = engine.get_page();

    let mut page = Page::default();
    page.blocks.insert("x".into(), Block::new("x", "box"));
    page.regions[0].blocks.push("x".into());
    engine.set_page(page.clone());

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        EngineEvent::PageSet {
            previous_page: Box::new(previous),
            new_page: Box::new(page),
        }
    );
    assert!(!engine.can_undo());
    assert!(!engine.can_redo());
}

#[test]
fn test_get_page_is_a_copy() {
    let mut engine = engine();
    let id = engine.insert_block("box", InsertOptions::default()).unwrap();

    let mut copy = engine.get_page();
    copy.blocks.clear();
    copy.regions.clear();

    assert!(engine.get_block_by_id(&id).is_some());
    assert_eq!(engine.get_page().regions.len(), 1);
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let json = r#"{
        "blockSchemas": [
            { "type": "box", "accepts": ["*"] },
            { "type": "text", "properties": [{ "id": "content", "type": "text", "default": "Hi" }] }
        ],
        "maxHistorySize": 2,
        "page": {
            "blocks": {
                "a": { "id": "a", "type": "box", "children": ["b"] },
                "b": { "id": "b", "type": "text" }
            },
            "regions": []
        }
    }"#;

    let config: EngineConfig = serde_json::from_str(json)?;
    let mut engine = Engine::new(config)?;

    let page = engine.get_page();
    assert_eq!(page.regions[0].blocks, vec!["a"]);
    assert_eq!(page.blocks["b"].parent_id.as_deref(), Some("a"));

    for _ in 0..3 {
        engine.insert_block("text", InsertOptions::default())?;
    }
    assert_eq!(engine.history().len(), 2);
    Ok(())
}

#[test]
fn test_removing_a_parent_leaves_no_structural_issues() {
    let mut engine = engine();
    let parent = engine.insert_block("box", InsertOptions::default()).unwrap();
    let child = engine
        .insert_block("text", InsertOptions::in_parent(parent.clone()))
        .unwrap();

    engine.remove_block(&parent).unwrap();

    let page = engine.get_page();
    assert!(page.structural_issues().is_empty());
    assert!(page.contains(&child));

    engine.undo().unwrap();
    assert!(engine.get_page().check_integrity().is_empty());
}
