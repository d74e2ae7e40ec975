use avi_core::{EventStore, FlowEngine, FlowEventKind, InMemoryEventStore, InMemoryFlowRepository};
use uuid::Uuid;

#[test]
fn integration_smoke_inmemory_store_and_engine() {
    let mut store = InMemoryEventStore::default();
    let flow_id = Uuid::new_v4();

    let ev = store.append_kind(flow_id,
                               FlowEventKind::FlowInitialized { definition_hash: "h1".to_string(),
                                                                step_count: 1 });
    assert_eq!(ev.seq, 0);

    let engine: FlowEngine<_, _> = FlowEngine::new_with_stores(store, InMemoryFlowRepository::new());
    let events = engine.event_store().list(flow_id);
    assert!(events.iter().any(|e| matches!(e.kind, FlowEventKind::FlowInitialized { .. })),
            "FlowInitialized missing");
    assert!(engine.events_for(Uuid::new_v4()).is_empty());
}
