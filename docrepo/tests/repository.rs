use std::{collections::HashSet, sync::Arc};

use bson::{Bson, doc};
use docrepo::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, docrepo::Entity)]
struct Customer {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    age: i32,
}

fn customer(id: &str, name: &str, age: i32) -> Customer {
    Customer {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        age,
    }
}

fn customers() -> GenericRepository<Customer, InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new());
    store
        .repository::<Customer>(RepositoryConfig::new("customers", "crm"))
        .unwrap()
}

#[tokio::test]
async fn add_update_delete_lifecycle() {
    let repo = customers();
    let alice = customer("a1", "Alice", 30);

    repo.add(&alice).await.unwrap();
    assert_eq!(repo.find_by_field(ID_FIELD, "a1").await.unwrap(), alice);

    let renamed = Customer {
        name: "Alicia".to_string(),
        ..alice.clone()
    };
    repo.update(&renamed).await.unwrap();
    assert_eq!(repo.find_by_field(ID_FIELD, "a1").await.unwrap().name, "Alicia");

    repo.delete(&renamed).await.unwrap();

    let err = repo.find_by_field(ID_FIELD, "a1").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.not_found_filter(), Some(&Filter::field("_id", "a1")));
    assert_eq!(err.to_string(), "_id (\"a1\") was not found");
}

#[tokio::test]
async fn delete_of_stale_entity_is_not_found() {
    let repo = customers();
    let alice = customer("a1", "Alice", 30);

    repo.add(&alice).await.unwrap();
    repo.update(&customer("a1", "Alice", 31)).await.unwrap();

    let err = repo.delete(&alice).await.unwrap_err();

    assert!(matches!(err, RepositoryError::NotFound(Filter::Example(_))));
    assert_eq!(repo.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_of_missing_entity_is_not_found() {
    let repo = customers();

    let err = repo.update(&customer("ghost", "Ghost", 1)).await.unwrap_err();

    assert_eq!(err.not_found_filter(), Some(&Filter::field(ID_FIELD, "ghost")));
    assert!(repo.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_by_field_replaces_first_match() {
    let repo = customers();
    repo.add(&customer("b1", "Bob", 40)).await.unwrap();

    repo.update_by_field("email", "bob@example.com", &customer("b1", "Robert", 41))
        .await
        .unwrap();

    let bob = repo.find_by_field(ID_FIELD, "b1").await.unwrap();
    assert_eq!(bob.name, "Robert");
    assert_eq!(bob.age, 41);
}

async fn assert_exists_matches_find(repo: &GenericRepository<Customer, InMemoryStore>, entity: &Customer) {
    let by_example = repo.exists_by_example(entity).await.unwrap();
    assert_eq!(by_example, repo.find_by_example(entity).await.is_ok(), "example {entity:?}");

    for (key, value) in [
        (ID_FIELD, Bson::from(entity.id.as_str())),
        ("name", Bson::from(entity.name.as_str())),
        ("email", Bson::from(entity.email.as_str())),
    ] {
        let exists = repo.exists_by_field(key, value.clone()).await.unwrap();
        let found = repo.find_by_field(key, value.clone()).await;
        assert_eq!(exists, found.is_ok(), "{key} = {value}");
    }
}

#[tokio::test]
async fn exists_agrees_with_find() {
    let repo = customers();
    let alice = customer("a1", "Alice", 30);
    let older = customer("a1", "Alice", 31);

    assert_exists_matches_find(&repo, &alice).await;

    repo.add(&alice).await.unwrap();
    assert!(repo.exists_by_example(&alice).await.unwrap());
    assert_exists_matches_find(&repo, &alice).await;
    assert_exists_matches_find(&repo, &older).await;

    repo.update(&older).await.unwrap();
    assert!(!repo.exists_by_example(&alice).await.unwrap());
    assert!(repo.exists_by_example(&older).await.unwrap());
    assert_exists_matches_find(&repo, &alice).await;
    assert_exists_matches_find(&repo, &older).await;

    repo.delete(&older).await.unwrap();
    assert!(!repo.exists_by_field(ID_FIELD, "a1").await.unwrap());
    assert_exists_matches_find(&repo, &alice).await;
    assert_exists_matches_find(&repo, &older).await;

    assert!(!repo.exists_by_filter(doc! { "age": { "$gt": 18 } }).await.unwrap());
}

#[tokio::test]
async fn exists_reports_undecodable_documents_like_find() {
    let store = InMemoryStore::new();
    let binding = RepositoryConfig::new("customers", "crm");
    store
        .insert_one(&binding, doc! { "_id": "x", "name": "Alice" })
        .await
        .unwrap();
    let repo = GenericRepository::<Customer, _>::new(store, binding).unwrap();

    let exists = repo.exists_by_field("name", "Alice").await.unwrap_err();
    let found = repo.find_by_field("name", "Alice").await.unwrap_err();

    assert!(matches!(exists, RepositoryError::Serialization(_)));
    assert!(matches!(found, RepositoryError::Serialization(_)));
    assert!(!repo.exists_by_field("name", "Bob").await.unwrap());
}

#[tokio::test]
async fn get_all_returns_each_entity_once() {
    let repo = customers();
    for (id, name) in [("a1", "Alice"), ("b1", "Bob"), ("c1", "Carol")] {
        repo.add(&customer(id, name, 20)).await.unwrap();
    }

    let all = repo.get_all().await.unwrap();
    let ids = all.iter().map(|c| c.id.as_str()).collect::<HashSet<_>>();

    assert_eq!(all.len(), 3);
    assert_eq!(ids, HashSet::from(["a1", "b1", "c1"]));
}

#[tokio::test]
async fn raw_and_field_filters() {
    let repo = customers();
    repo.add(&customer("a1", "Alice", 30)).await.unwrap();
    repo.add(&customer("b1", "Bob", 17)).await.unwrap();
    repo.add(&customer("c1", "Carol", 30)).await.unwrap();

    let adults = repo
        .find_all_by_filter(doc! { "age": { "$gte": 18 } })
        .await
        .unwrap();
    let thirty = repo.find_all_by_field("age", 30).await.unwrap();
    let nobody = repo.find_all_by_field("age", 99).await.unwrap();
    let bob = repo
        .find_by_filter(doc! { "$or": [{ "name": "Bob" }, { "name": "Dave" }] })
        .await
        .unwrap();

    assert_eq!(adults.len(), 2);
    assert_eq!(thirty.len(), 2);
    assert!(nobody.is_empty());
    assert_eq!(bob.id, "b1");
    assert!(repo.find_by_filter(doc! { "age": 99 }).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn find_by_example_matches_whole_entity() {
    let repo = customers();
    let alice = customer("a1", "Alice", 30);
    repo.add(&alice).await.unwrap();

    assert_eq!(repo.find_by_example(&alice).await.unwrap(), alice);
    assert!(
        repo.find_by_example(&customer("a1", "Alice", 31))
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn duplicate_add_is_rejected() {
    let repo = customers();
    repo.add(&customer("a1", "Alice", 30)).await.unwrap();

    let err = repo.add(&customer("a1", "Impostor", 1)).await.unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateKey(_)));
    assert_eq!(repo.find_by_field(ID_FIELD, "a1").await.unwrap().name, "Alice");
}

#[tokio::test]
async fn concurrent_adds_are_all_visible() {
    let repo = Arc::new(customers());

    let handles = (0..32)
        .map(|i| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.add(&customer(&format!("c{i}"), "Crowd", i)).await })
        })
        .collect::<Vec<_>>();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(repo.get_all().await.unwrap().len(), 32);
    assert_eq!(repo.find_all_by_field("name", "Crowd").await.unwrap().len(), 32);
}

#[tokio::test]
async fn repositories_share_a_backend_by_binding() {
    let store = DocumentStore::new(InMemoryStore::new());
    let crm = store
        .repository::<Customer>(RepositoryConfig::new("customers", "crm"))
        .unwrap();
    let archive = store
        .repository::<Customer>(RepositoryConfig::new("customers", "archive"))
        .unwrap();

    crm.add(&customer("a1", "Alice", 30)).await.unwrap();

    assert_eq!(crm.get_all().await.unwrap().len(), 1);
    assert!(archive.get_all().await.unwrap().is_empty());
    assert_eq!(store.backend().list_collections("crm").await, vec!["customers".to_string()]);

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn repository_from_settings() {
    let store = DocumentStore::new(InMemoryStore::new());
    let settings = RepositorySettings::from_json_str(
        r#"{ "MongoGenericRepo": { "Customer": { "Collection": "customers", "Database": "crm" } } }"#,
    )
    .unwrap();

    let repo = store.repository_from_settings::<Customer>(&settings).unwrap();

    assert_eq!(repo.config(), &RepositoryConfig::new("customers", "crm"));
}

#[test]
fn construction_fails_without_binding() {
    let store = DocumentStore::new(InMemoryStore::new());
    let settings = RepositorySettings::from_pairs([("MongoGenericRepo:Customer:Database", "crm")]);

    let err = store.repository_from_settings::<Customer>(&settings).unwrap_err();
    assert!(
        matches!(err, RepositoryError::ConfigurationMissing(ref key) if key == "MongoGenericRepo:Customer:Collection")
    );

    let err = store
        .repository::<Customer>(RepositoryConfig::new("customers", " "))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ConfigurationMissing(_)));
}

#[tokio::test]
async fn dynamic_backend() {
    let backend: Arc<dyn StoreBackend> = Arc::new(InMemoryStore::new());
    let repo =
        GenericRepository::<Customer, _>::new(Arc::clone(&backend), RepositoryConfig::new("customers", "crm"))
            .unwrap();

    repo.add(&customer("a1", "Alice", 30)).await.unwrap();

    let count = backend
        .count(repo.config(), &Filter::all(), None)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
