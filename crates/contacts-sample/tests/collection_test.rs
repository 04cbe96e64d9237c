use contacts_sample::lifecycle::{ContactSystem, CONTACTS};
use contacts_sample::model::contact;
use serde_json::json;
use simple_store::mock::{create_mock_transport, expect_get, MockTransport};
use simple_store::{Collection, ConfigLayer, FetchState, Method, ModelVariant, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn setup() -> (ContactSystem, MockTransport) {
    let mock = MockTransport::new();
    let system = ContactSystem::new(Arc::new(mock.clone()));
    (system, mock)
}

fn joe_and_jane() -> Vec<serde_json::Value> {
    vec![
        json!({"id": 1, "first_name": "Joe", "last_name": "Blow"}),
        json!({"id": 2, "first_name": "Jane", "last_name": "Doe"}),
    ]
}

#[test]
fn test_url_comes_from_model() {
    let (system, _) = setup();
    assert_eq!(system.contacts().url().as_deref(), Some("/contacts"));
}

#[test]
fn test_url_from_model_defined_inline() {
    let (system, _) = setup();
    let mut contacts = system.contacts();
    contacts.set_model(ModelVariant::new("Person").extend(ConfigLayer::new().url("/people")));
    assert_eq!(contacts.url().as_deref(), Some("/people"));
}

#[test]
fn test_url_can_be_overridden() {
    let (system, _) = setup();
    let mut contacts = system.contacts();
    contacts.set_url(Some("/contacts/active".to_string()));
    assert_eq!(contacts.url().as_deref(), Some("/contacts/active"));
}

#[test]
fn test_load_single_resource() {
    let (system, _) = setup();
    let contacts = system.contacts();
    assert_eq!(contacts.len(), 0, "no resources loaded yet");

    contacts.load(&json!({"id": 1, "first_name": "Joe", "last_name": "Blow"}));
    assert_eq!(contacts.len(), 1, "resource loaded");
}

#[test]
fn test_load_adds_to_index() {
    let (system, _) = setup();
    let contacts = system.contacts();
    contacts.load(&json!({"id": 1, "first_name": "joe", "last_name": "blow"}));
    assert_eq!(contacts.content().len(), contacts.index().len());
    assert_eq!(contacts.index(), vec![json!(1)]);
}

#[test]
fn test_load_all() {
    let (system, _) = setup();
    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());
    assert_eq!(contacts.len(), 2, "resources loaded");
}

#[test]
fn test_clear_all() {
    let (system, mock) = setup();
    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());
    assert_eq!(contacts.len(), 2);

    contacts.clear_all();
    assert_eq!(contacts.len(), 0, "no resources loaded");
    assert!(contacts.index().is_empty());
    assert!(mock.requests().is_empty());
}

#[test]
fn test_collection_is_shared_through_store() {
    let (system, _) = setup();
    system.contacts().load_all(&joe_and_jane());
    assert_eq!(system.store().collection(CONTACTS).map(Collection::len), Some(2));
}

#[test]
fn test_contacts_is_the_registered_collection() {
    let (system, _) = setup();
    let registered = system.store().collection(CONTACTS).expect("contacts are registered");
    registered.load(&json!({"id": 1, "first_name": "Joe"}));

    let joe = system.contacts().find_by_id_in_store(1).expect("Joe is visible");
    assert_eq!(joe.get("first_name"), Some(json!("Joe")));
    assert_eq!(system.store().names(), vec![CONTACTS]);
}

#[tokio::test]
async fn test_find_by_id_local_hit() {
    let (system, mock) = setup();
    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());

    let joe = contacts.find_by_id(1);
    assert_eq!(joe.get("first_name"), Some(json!("Joe")));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_find_from_server_when_not_in_store() {
    let (transport, mut server) = create_mock_transport(8);
    let system = ContactSystem::new(Arc::new(transport));
    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());

    let dan = contacts.find_by_id(3);
    assert_eq!(dan.id(), Some(json!(3)));
    assert_eq!(dan.state(), Some(FetchState::Finding));

    let pending = expect_get(&mut server).await.expect("Expected GET request");
    assert_eq!(pending.request.url, "/contacts/3");
    pending.respond_ok(json!({"id": 3, "first_name": "Tall", "last_name": "Dan"}));

    dan.loaded().await;
    assert_eq!(dan.state(), Some(FetchState::Loaded));
    assert_eq!(dan.get("first_name"), Some(json!("Tall")));
    assert_eq!(contacts.len(), 2, "placeholder is not added");
}

#[tokio::test]
async fn test_find_from_server_ignores_array_response() {
    let (transport, mut server) = create_mock_transport(8);
    let contacts = Collection::new(contact(), Arc::new(transport));

    let dan = contacts.find_by_id(3);
    let pending = expect_get(&mut server).await.expect("Expected GET request");
    pending.respond_ok(json!([{"id": 3, "first_name": "Tall", "last_name": "Dan"}]));

    dan.loaded().await;
    assert_eq!(dan.id(), Some(json!(3)), "found by id from server");
    assert_eq!(dan.get("first_name"), None);
}

#[tokio::test]
async fn test_find_from_server_returns_same_handle_it_fills() {
    let (transport, mut server) = create_mock_transport(8);
    let contacts = Collection::new(contact(), Arc::new(transport));

    let dan = contacts.find_from_server(3);
    let watcher = dan.clone();
    let mut changes = watcher.subscribe();

    expect_get(&mut server)
        .await
        .expect("Expected GET request")
        .respond_ok(json!({"id": 3, "last_name": "Dan"}));

    changes.changed().await.unwrap();
    dan.loaded().await;
    assert!(Record::ptr_eq(&dan, &watcher));
    assert_eq!(watcher.get("last_name"), Some(json!("Dan")));
}

#[test]
fn test_update_existing_record() {
    let (system, _) = setup();
    let contacts = system.contacts();
    contacts.load(&json!({"id": 1, "first_name": "joe", "last_name": "blow"}));
    contacts.load(&json!({"id": 1, "first_name": "joe", "last_name": "GO"}));

    assert_eq!(contacts.len(), 1, "same number of records");
    let joe = contacts.find_by_id_in_store(1).expect("Joe is loaded");
    assert_eq!(joe.get("last_name"), Some(json!("GO")));
}

#[tokio::test]
async fn test_find_all_via_transport() {
    let (system, mock) = setup();
    mock.expect(Method::Get, "/contacts")
        .return_ok(json!(joe_and_jane()));

    let contacts = system.contacts();
    assert_eq!(contacts.len(), 0, "no resources loaded yet");

    let done = Arc::new(AtomicBool::new(false));
    let flag = done.clone();
    contacts
        .find_all()
        .done(move |_| flag.store(true, Ordering::SeqCst))
        .fail(|e| panic!("findAll() failed: {e}"))
        .await
        .unwrap();

    assert!(done.load(Ordering::SeqCst), "findAll() done");
    assert_eq!(contacts.len(), 2, "resources loaded");
    mock.verify();
}

#[tokio::test]
async fn test_find_all_replaces_content_in_response_order() {
    let (system, mock) = setup();
    mock.expect(Method::Get, "/contacts").return_ok(json!([
        {"id": 2, "first_name": "Jane"},
        {"id": 5, "first_name": "Eve"},
    ]));

    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());
    let jane_before = contacts.find_by_id_in_store(2).unwrap();

    contacts.find_all().await.unwrap();

    assert_eq!(contacts.index(), vec![json!(2), json!(5)]);
    let jane_after = contacts.find_by_id_in_store(2).unwrap();
    assert!(!Record::ptr_eq(&jane_before, &jane_after));
    assert!(contacts.find_by_id_in_store(1).is_none());
}

#[tokio::test]
async fn test_find_all_failure_keeps_content() {
    let (system, mock) = setup();
    mock.expect(Method::Get, "/contacts")
        .return_err(simple_store::TransportError::Network("connection refused".into()));

    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());

    assert!(contacts.find_all().await.is_err());
    assert_eq!(contacts.len(), 2);
}

#[tokio::test]
async fn test_refresh_contacts_returns_typed_snapshot() {
    let (system, mock) = setup();
    mock.expect(Method::Get, "/contacts")
        .return_ok(json!(joe_and_jane()));

    let snapshot = system.refresh_contacts().await.unwrap();
    let names: Vec<String> = snapshot.iter().map(|c| c.full_name()).collect();
    assert_eq!(names, vec!["Joe Blow", "Jane Doe"]);
}

#[tokio::test]
async fn test_clear_then_find_by_id_goes_to_server() {
    let (transport, mut server) = create_mock_transport(8);
    let system = ContactSystem::new(Arc::new(transport));
    let contacts = system.contacts();
    contacts.load_all(&joe_and_jane());

    system.reset();
    let joe = contacts.find_by_id(1);
    assert_eq!(joe.state(), Some(FetchState::Finding));

    let pending = expect_get(&mut server).await.expect("Expected GET request");
    assert_eq!(pending.request.url, "/contacts/1");
    pending.respond_ok(json!({"id": 1, "first_name": "Joe"}));
    joe.loaded().await;
    assert_eq!(joe.get("first_name"), Some(json!("Joe")));
}
