//! End-to-end flows against the in-process mock backend.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, json};

use common::MockBackend;
use nexus_console::api::chat::{A2aMessage, McpRequest};
use nexus_console::api::types::{Agency, EntityId, NewAgency, NewAgent};
use nexus_console::confirm::AssumeYes;
use nexus_console::console::lookup;
use nexus_console::modal::{ModalOutcome, ToolModal};
use nexus_console::pages::AgenciesPage;
use nexus_console::routes::Route;
use nexus_console::workflow::WorkflowViewer;
use nexus_console::ApiError;

fn id(n: i64) -> EntityId {
    EntityId::from(n.to_string())
}

// ── Stores ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_all_keeps_backend_order_and_int_ids() {
    let backend = MockBackend::start().await;
    for name in ["Zeta", "Alpha", "Mid"] {
        backend.seed("agencies", json!({ "name": name }));
    }
    let console = backend.console();

    console.agencies.fetch_all().await.unwrap();

    let names: Vec<_> = console.agencies.items().into_iter().map(|a| a.name).collect();
    assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    assert_eq!(console.agencies.items()[0].id.as_str(), "1");
    assert!(console.agencies.error().is_none());
}

#[tokio::test]
async fn create_appends_backend_copy() {
    let backend = MockBackend::start().await;
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();

    let created = console
        .agents
        .create(NewAgent { name: "a1".into(), role: None })
        .await
        .unwrap();

    assert_eq!(console.agents.get_by_id(&created.id), Some(created.clone()));
    let posts = backend.requests_to("POST", "/api/agents");
    assert_eq!(posts[0].body, Some(json!({ "name": "a1" })));
}

#[tokio::test]
async fn update_replaces_in_place() {
    let backend = MockBackend::start().await;
    backend.seed("agencies", json!({ "name": "A" }));
    let b = backend.seed("agencies", json!({ "name": "B" }));
    backend.seed("agencies", json!({ "name": "C" }));
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();

    let mut agency = console.agencies.get_by_id(&id(b)).unwrap();
    agency.name = "B2".into();
    console.agencies.update(agency).await.unwrap();

    let names: Vec<_> = console.agencies.items().into_iter().map(|a| a.name).collect();
    assert_eq!(names, ["A", "B2", "C"]);
    let puts = backend.requests_to("PUT", &format!("/api/agencies/{b}"));
    // Ids go back out in string form.
    assert_eq!(puts[0].body, Some(json!({ "id": b.to_string(), "name": "B2" })));
}

#[tokio::test]
async fn delete_drops_from_cache() {
    let backend = MockBackend::start().await;
    let t = backend.seed("tools", json!({ "name": "Scraper", "type": "web" }));
    let console = backend.console();
    console.tools.fetch_all().await.unwrap();

    console.tools.delete(&id(t)).await.unwrap();

    assert!(console.tools.items().is_empty());
    assert!(backend.stored("tools").is_empty());
}

#[tokio::test]
async fn failed_update_keeps_cache_and_sets_error() {
    let backend = MockBackend::start().await;
    let a = backend.seed("agents", json!({ "name": "Old", "role": "r" }));
    backend.fail("PUT", &format!("/api/agents/{a}"));
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();

    let mut page = console.agent_page(id(1), id(a));
    page.start_edit();
    page.form.name = "New".into();
    let err = page.submit_update().await.unwrap_err();

    assert_eq!(err, ApiError::Status { status: 500, message: "boom".into() });
    assert_eq!(console.agents.error(), Some(err));
    assert_eq!(console.agents.get_by_id(&id(a)).unwrap().name, "Old");
    assert!(page.is_editing());
}

// ── Agencies page ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn agencies_page_creates_and_lists() {
    let backend = MockBackend::start().await;
    let console = backend.console();
    let mut page = AgenciesPage::new(&console.agencies);
    page.mount().await.unwrap();
    assert!(page.render().contains("No agencies found."));

    page.form.name = "Ops".into();
    page.form.description = "  ".into();
    let created = page.submit_create().await.unwrap().unwrap();

    assert_eq!(page.form.name, "");
    assert_eq!(
        backend.requests_to("POST", "/api/agencies")[0].body,
        Some(json!({ "name": "Ops" }))
    );
    assert!(page.render().contains(&format!("- Ops  (/agencies/{})", created.id)));
}

// ── Agency ↔ agent associations ───────────────────────────────────────────────

#[tokio::test]
async fn agency_detail_assign_and_remove_resync() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    let a1 = backend.seed("agents", json!({ "name": "a1" }));
    let a2 = backend.seed("agents", json!({ "name": "a2" }));
    backend.link("agencies", ops, "agents", a1);
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();

    let mut page = console.agency_page(id(ops));
    page.mount().await.unwrap();

    let linked: Vec<_> = page.associations().linked().into_iter().map(|a| a.name).collect();
    assert_eq!(linked, ["a1"]);
    let offered: Vec<_> = page.assignable_agents().into_iter().map(|a| a.name).collect();
    assert_eq!(offered, ["a2"]);

    backend.clear_requests();
    page.assign_agent(&id(a2)).await.unwrap();

    let calls: Vec<_> = backend.requests().into_iter().map(|r| (r.method, r.path)).collect();
    assert_eq!(
        calls,
        [
            ("POST".to_string(), format!("/api/agencies/{ops}/agents/{a2}")),
            ("GET".to_string(), format!("/api/agencies/{ops}/agents")),
        ]
    );
    assert_eq!(page.associations().linked().len(), 2);
    assert!(page.assignable_agents().is_empty());

    page.remove_agent(&id(a1)).await.unwrap();
    let linked: Vec<_> = page.associations().linked().into_iter().map(|a| a.name).collect();
    assert_eq!(linked, ["a2"]);
    assert_eq!(backend.linked_ids("agencies", ops, "agents"), [a2]);
    assert!(page.render().contains(&format!("- a2 (/agencies/{ops}/agents/{a2}) [Remove]")));
}

#[tokio::test]
async fn failed_link_records_error_and_keeps_list() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    let a1 = backend.seed("agents", json!({ "name": "a1" }));
    backend.fail("POST", &format!("/api/agencies/{ops}/agents/{a1}"));
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();
    let mut page = console.agency_page(id(ops));
    page.mount().await.unwrap();

    assert!(page.assign_agent(&id(a1)).await.is_err());

    assert!(page.associations().linked().is_empty());
    assert!(page.render().contains("Error managing associations: backend returned 500: boom"));
}

#[tokio::test]
async fn declined_delete_sends_nothing() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();
    let mut page = console.agency_page(id(ops));

    let mut prompts = Vec::new();
    let deleted = page
        .delete(&mut |p: &str| {
            prompts.push(p.to_string());
            false
        })
        .await
        .unwrap();

    assert!(!deleted);
    assert_eq!(prompts, ["Are you sure you want to delete agency \"Ops\"?"]);
    assert!(backend.requests_to("DELETE", &format!("/api/agencies/{ops}")).is_empty());

    assert!(page.delete(&mut AssumeYes).await.unwrap());
    assert!(console.agencies.items().is_empty());
}

// ── Tool dialog ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn tool_modal_create_sends_empty_type_and_fires_callback_once() {
    let backend = MockBackend::start().await;
    let agent = backend.seed("agents", json!({ "name": "crawler" }));
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();
    let mut page = console.agent_page(id(1), id(agent));
    page.mount().await.unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    page.modal = ToolModal::new().with_on_success(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    page.open_create_tool();
    page.modal.name = "Scraper".into();

    let outcome = page.submit_tool_modal().await.unwrap();

    assert!(matches!(outcome, ModalOutcome::Saved(ref t) if t.name == "Scraper"));
    assert_eq!(
        backend.requests_to("POST", "/api/tools")[0].body,
        Some(json!({ "name": "Scraper", "type": "" }))
    );
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!page.modal.is_open());
    assert_eq!(console.tools.items().len(), 1);
}

#[tokio::test]
async fn tool_modal_edits_only_associated_tools() {
    let backend = MockBackend::start().await;
    let agent = backend.seed("agents", json!({ "name": "crawler" }));
    let linked = backend.seed("tools", json!({ "name": "Scraper", "type": "web" }));
    let other = backend.seed("tools", json!({ "name": "Mailer" }));
    backend.link("agents", agent, "tools", linked);
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();
    let mut page = console.agent_page(id(1), id(agent));
    page.mount().await.unwrap();

    assert!(!page.open_edit_tool(&id(other)));
    assert!(page.open_edit_tool(&id(linked)));
    assert_eq!(page.modal.title(), "Edit Tool");
    assert_eq!(page.modal.kind, "web");

    page.modal.name = "Scraper v2".into();
    page.submit_tool_modal().await.unwrap();

    let names: Vec<_> = page.associations().linked().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["Scraper v2"]);
    assert!(page.render().contains("Scraper v2"));
}

#[tokio::test]
async fn tool_modal_delete_resyncs_associations() {
    let backend = MockBackend::start().await;
    let agent = backend.seed("agents", json!({ "name": "crawler" }));
    let tool = backend.seed("tools", json!({ "name": "Scraper" }));
    backend.link("agents", agent, "tools", tool);
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();
    let mut page = console.agent_page(id(1), id(agent));
    page.mount().await.unwrap();

    page.open_edit_tool(&id(tool));
    let outcome = page.delete_tool_in_modal(&mut AssumeYes).await.unwrap();

    assert_eq!(outcome, ModalOutcome::Deleted);
    assert!(page.associations().linked().is_empty());
    assert!(console.tools.items().is_empty());
}

// ── Workflow ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn workflow_loads_graph_and_title() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    backend.set_workflow(
        ops,
        json!({
            "nodes": [
                { "id": "n1", "data": { "label": "Ops Flow" }, "position": { "x": 0.0, "y": 0.0 } },
                { "id": "n2", "data": { "label": "Review" }, "position": { "x": 200.0, "y": 80.0 } }
            ],
            "edges": [ { "id": "e1", "source": "n1", "target": "n2" } ]
        }),
    );

    let mut viewer = WorkflowViewer::new();
    viewer.load(&backend.client(), &id(ops)).await.unwrap();
    assert_eq!(viewer.title(), "Ops Flow");
    assert_eq!(viewer.nodes().len(), 2);
    assert!(!viewer.connect("n1", "n2"));
    assert!(viewer.connect("n2", "n1"));
    assert_eq!(viewer.edges()[1].id, "edge-n2-n1");

    let out = backend.console().open(&Route::parse(&format!("/workflow/{ops}"))).await;
    assert!(out.contains("# Workflow for: Ops Flow"));
    assert!(out.contains("- e1: n1 -> n2"));
}

#[tokio::test]
async fn empty_workflow_falls_back_to_agency_title() {
    let backend = MockBackend::start().await;
    let mut viewer = WorkflowViewer::new();
    viewer.load(&backend.client(), &id(7)).await.unwrap();
    assert_eq!(viewer.title(), "Agency 7");
    assert!(viewer.nodes().is_empty());
}

// ── Console routing ───────────────────────────────────────────────────────────

#[tokio::test]
async fn direct_detail_route_warms_cache() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops", "description": "Operations" }));
    let console = backend.console();

    let out = console.open(&Route::parse(&format!("/agencies/{ops}"))).await;

    assert!(out.contains("# Agency Details: Ops"));
    assert!(out.contains("Description: Operations"));
    assert!(out.contains("No agents currently associated with this agency."));
}

#[tokio::test]
async fn unknown_agency_renders_not_found() {
    let backend = MockBackend::start().await;
    backend.seed("agencies", json!({ "name": "Ops" }));
    let console = backend.console();
    console.agencies.create(NewAgency { name: "Other".into(), description: None }).await.unwrap();

    let out = console.open(&Route::parse("/agencies/99")).await;
    assert_eq!(out, "Agency not found.\n");
}

// ── Chat bindings ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn a2a_returns_backend_reply() {
    let backend = MockBackend::start().await;
    let mut payload = Map::new();
    payload.insert("text".into(), json!("hi"));
    let message = A2aMessage { sender_agent_id: 1, receiver_agent_id: 2, payload };

    let reply = backend.client().send_a2a(&message).await.unwrap();

    assert_eq!(reply["status"], json!("delivered"));
    assert_eq!(reply["echo"], json!({ "text": "hi" }));
}

#[tokio::test]
async fn unknown_mcp_tool_surfaces_detail() {
    let backend = MockBackend::start().await;
    let request = McpRequest { tool_name: "nope".into(), args: Map::new() };

    let err = backend.client().call_mcp_tool(&request).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Status { status: 404, message: "Tool 'nope' not found".into() }
    );
}

#[tokio::test]
async fn ops_agency_assign_then_remove_round() {
    let backend = MockBackend::start().await;
    let a1 = backend.seed("agents", json!({ "name": "a1" }));
    let console = backend.console();
    let ops = console
        .agencies
        .create(NewAgency { name: "Ops".into(), description: None })
        .await
        .unwrap();
    let mut page = console.agency_page(ops.id.clone());
    page.mount().await.unwrap();

    page.assign_agent(&id(a1)).await.unwrap();
    let linked: Vec<_> = page.associations().linked().into_iter().map(|a| a.name).collect();
    assert_eq!(linked, ["a1"]);

    page.remove_agent(&id(a1)).await.unwrap();
    assert!(page.associations().linked().is_empty());
    assert_eq!(page.assignable_agents().len(), 1);
}

#[tokio::test]
async fn delete_agent_leaves_stale_association_until_refresh() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    let a1 = backend.seed("agents", json!({ "name": "a1" }));
    backend.link("agencies", ops, "agents", a1);
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();
    let mut page = console.agency_page(id(ops));
    page.mount().await.unwrap();

    console.agents.delete(&id(a1)).await.unwrap();

    assert!(console.agents.get_by_id(&id(a1)).is_none());
    assert_eq!(page.associations().linked().len(), 1);

    page.associations().refresh().await.unwrap();
    assert!(page.associations().linked().is_empty());
}

#[tokio::test]
async fn mutation_keeps_previous_error_until_fetch_all() {
    let backend = MockBackend::start().await;
    backend.seed("agencies", json!({ "name": "Ops" }));
    backend.fail("GET", "/api/agencies");
    let console = backend.console();

    assert!(console.agencies.fetch_all().await.is_err());
    let stale = console.agencies.error();
    assert!(stale.is_some());

    console
        .agencies
        .create(NewAgency { name: "Labs".into(), description: None })
        .await
        .unwrap();
    assert_eq!(console.agencies.error(), stale);

    backend.recover("GET", "/api/agencies");
    console.agencies.fetch_all().await.unwrap();
    assert!(console.agencies.error().is_none());
    assert_eq!(console.agencies.items().len(), 2);
}

// ── Command paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn agency_update_does_not_need_association_list() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    backend.fail("GET", &format!("/api/agencies/{ops}/agents"));
    let console = backend.console();
    console.agencies.fetch_all().await.unwrap();

    lookup(&console.agencies, &id(ops)).unwrap();
    let mut page = console.agency_page(id(ops));
    page.start_edit();
    page.form.name = "Ops 2".into();
    let saved = page.submit_update().await.unwrap().unwrap();

    assert_eq!(saved.name, "Ops 2");
    assert_eq!(backend.requests_to("PUT", &format!("/api/agencies/{ops}")).len(), 1);
    assert!(backend.requests_to("GET", &format!("/api/agencies/{ops}/agents")).is_empty());
}

#[tokio::test]
async fn unknown_ids_are_reported_and_never_deleted() {
    let backend = MockBackend::start().await;
    backend.seed("agents", json!({ "name": "a1" }));
    let console = backend.console();
    console.agents.fetch_all().await.unwrap();

    let err = lookup(&console.agents, &id(99)).unwrap_err();
    assert_eq!(err.to_string(), "agent 99 not found");

    let mut page = console.agent_page(EntityId::from(""), id(99));
    assert!(!page.delete(&mut AssumeYes).await.unwrap());
    assert!(backend.requests_to("DELETE", "/api/agents/99").is_empty());
}

// ── Client surface ────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_returns_entity_or_not_found() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops", "description": "d" }));
    let client = backend.client();

    let agency: Agency = client.get(&id(ops)).await.unwrap();
    assert_eq!(agency.name, "Ops");
    assert_eq!(agency.description.as_deref(), Some("d"));

    let err = client.get::<Agency>(&id(42)).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err, ApiError::Status { status: 404, message: "agencies item not found".into() });
}

#[tokio::test]
async fn named_association_calls_hit_nested_paths() {
    let backend = MockBackend::start().await;
    let ops = backend.seed("agencies", json!({ "name": "Ops" }));
    let a1 = backend.seed("agents", json!({ "name": "a1" }));
    let t1 = backend.seed("tools", json!({ "name": "grep", "type": "cli" }));
    let client = backend.client();

    client.assign_agent_to_agency(&id(ops), &id(a1)).await.unwrap();
    client.assign_tool_to_agent(&id(a1), &id(t1)).await.unwrap();
    let agents = client.agents_for_agency(&id(ops)).await.unwrap();
    let tools = client.tools_for_agent(&id(a1)).await.unwrap();
    assert_eq!(agents[0].name, "a1");
    assert_eq!(tools[0].kind.as_deref(), Some("cli"));

    client.remove_agent_from_agency(&id(ops), &id(a1)).await.unwrap();
    client.remove_tool_from_agent(&id(a1), &id(t1)).await.unwrap();
    assert!(client.agents_for_agency(&id(ops)).await.unwrap().is_empty());
    assert!(client.tools_for_agent(&id(a1)).await.unwrap().is_empty());

    let calls: Vec<_> = backend
        .requests()
        .into_iter()
        .filter(|r| r.method != "GET")
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(
        calls,
        [
            format!("POST /api/agencies/{ops}/agents/{a1}"),
            format!("POST /api/agents/{a1}/tools/{t1}"),
            format!("DELETE /api/agencies/{ops}/agents/{a1}"),
            format!("DELETE /api/agents/{a1}/tools/{t1}"),
        ]
    );
}
