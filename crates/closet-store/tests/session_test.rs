//! Session-level behavior: notification dedup across stores, persistence
//! across sessions, and wishlist reconciliation driven by the auth signal
//! against a mock HTTP backend.

use std::sync::Arc;
use std::time::Duration;

use closet_client::{ClosetClient, ClosetConfig};
use closet_core::{CatalogItem, ItemId, ItemRef, UserId, Variant};
use closet_store::{
    AddOptions, AuthSignal, AuthState, FileStorage, KeyValueStore, MemoryStorage, MemoryToaster,
    Reconciliation, RemoteCollection, RemoteSyncState, Session,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn named(id: &str, name: &str) -> ItemRef {
    ItemRef::from(CatalogItem {
        name: Some(name.into()),
        price: Some(499.0),
        ..CatalogItem::from_id(id)
    })
}

fn local_session(storage: Arc<dyn KeyValueStore>) -> (Arc<MemoryToaster>, Session) {
    let toaster = Arc::new(MemoryToaster::new());
    let session = Session::new(storage, toaster.clone(), None, Duration::from_millis(300));
    (toaster, session)
}

#[tokio::test(start_paused = true)]
async fn three_rapid_adds_produce_three_toasts() {
    let (toaster, session) = local_session(Arc::new(MemoryStorage::new()));
    for (id, name) in [("a", "Shirt"), ("b", "Kurta"), ("c", "Jeans")] {
        session.cart.add(&named(id, name), &AddOptions::default());
        // A re-render observes again; it must not duplicate the toast.
        session.cart.observe_notifications();
    }
    assert_eq!(
        toaster.messages(),
        vec!["Shirt added to cart", "Kurta added to cart", "Jeans added to cart"]
    );
}

#[tokio::test(start_paused = true)]
async fn remove_announces_with_item_name() {
    let (toaster, session) = local_session(Arc::new(MemoryStorage::new()));
    session.wardrobe.add(&named("a", "Blazer"), &AddOptions::default());
    session.wardrobe.remove(&ItemId::new("a").unwrap(), &Variant::default());
    assert_eq!(
        toaster.messages(),
        vec!["Blazer added to wardrobe", "Blazer removed from wardrobe"]
    );
}

#[tokio::test(start_paused = true)]
async fn quantity_dropping_to_zero_announces_removal() {
    let (toaster, session) = local_session(Arc::new(MemoryStorage::new()));
    let id = ItemId::new("a").unwrap();
    session.cart.add(&named("a", "Saree"), &AddOptions::default().with_quantity(2));
    session.cart.update_quantity(&id, &Variant::default(), -1);
    assert_eq!(toaster.messages(), vec!["Saree added to cart"]);

    session.cart.update_quantity(&id, &Variant::default(), -1);
    session.cart.observe_notifications();
    assert!(session.cart.is_empty());
    assert_eq!(
        toaster.messages(),
        vec!["Saree added to cart", "Saree removed from cart"]
    );
}

#[tokio::test]
async fn collections_survive_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStorage::open(dir.path()).unwrap());
    {
        let (_, session) = local_session(storage.clone());
        session.cart.add(&named("a", "Shirt"), &AddOptions::variant("L", "Blue").with_quantity(2));
        session.wardrobe.add(&ItemRef::Id("w1".into()), &AddOptions::default());
        session.searches.record("linen shirt");
    }
    let (_, session) = local_session(storage);
    assert_eq!(session.cart.total_count(), 2);
    assert_eq!(session.cart.total_value(), 998.0);
    assert!(session.wardrobe.contains(&ItemId::new("w1").unwrap()));
    assert_eq!(session.searches.list(), vec!["linen shirt"]);
}

#[tokio::test]
async fn loading_auth_state_is_ignored() {
    let (_, session) = local_session(Arc::new(MemoryStorage::new()));
    let state = AuthState {
        user: Some(UserId("u1".into())),
        loading: true,
    };
    assert_eq!(session.sync_auth(state).await, Reconciliation::Unchanged);
    assert!(!session.wishlist.is_signed_in());
}

async fn wishlist_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "wishlist": [
                { "_id": "remote-1", "name": "Saree", "price": 1299 },
                "remote-2"
            ]
        })))
        .mount(&server)
        .await;
    server
}

fn remote_for(server: &MockServer) -> Arc<dyn RemoteCollection> {
    let config = ClosetConfig::local_mock(&format!("{}/api", server.uri()))
        .unwrap()
        .with_token("t0ken");
    let client = ClosetClient::new(&config).unwrap();
    Arc::new(client.wishlist().clone())
}

#[tokio::test]
async fn sign_in_replaces_wishlist_and_mutations_reach_remote() {
    let server = wishlist_server().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add"))
        .and(body_json(serde_json::json!({ "id": "p9" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryToaster::new()),
        Some(remote_for(&server)),
        Duration::from_millis(300),
    );
    session
        .wishlist
        .add(&ItemRef::Id("local-only".into()), &AddOptions::default())
        .await;

    let reconciled = session
        .sync_auth(AuthState::signed_in(UserId("u1".into())))
        .await;
    assert_eq!(reconciled, Reconciliation::Replaced { entries: 2 });
    let ids: Vec<String> = session
        .wishlist
        .store()
        .entries()
        .iter()
        .map(|e| e.identity.to_string())
        .collect();
    assert_eq!(ids, vec!["remote-1", "remote-2"]);

    let outcome = session
        .wishlist
        .add(&ItemRef::Id("p9".into()), &AddOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.remote, RemoteSyncState::RemoteConfirmed);
}

#[tokio::test]
async fn failed_remote_remove_keeps_local_removal() {
    let server = wishlist_server().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/remove"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = Session::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryToaster::new()),
        Some(remote_for(&server)),
        Duration::from_millis(300),
    );
    session
        .sync_auth(AuthState::signed_in(UserId("u1".into())))
        .await;
    let outcome = session
        .wishlist
        .remove(&ItemId::new("remote-2").unwrap(), &Variant::default())
        .await
        .unwrap();
    assert_eq!(outcome.remote, RemoteSyncState::RemoteFailed);
    assert_eq!(session.wishlist.store().len(), 1);
}

#[tokio::test]
async fn watch_auth_follows_sign_in_and_sign_out() {
    let server = wishlist_server().await;
    let session = Arc::new(Session::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryToaster::new()),
        Some(remote_for(&server)),
        Duration::from_millis(300),
    ));
    let signal = AuthSignal::default();
    let handle = session.watch_auth(signal.subscribe());

    signal.sign_in(UserId("u1".into()));
    wait_for(|| session.wishlist.store().len() == 2).await;

    signal.sign_out();
    wait_for(|| session.wishlist.store().is_empty()).await;
    assert!(!session.wishlist.is_signed_in());

    drop(signal);
    handle.await.unwrap();
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
