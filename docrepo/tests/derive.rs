use bson::{Bson, oid::ObjectId};
use docrepo::{Entity, document::Entity as _, prelude::EntityExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
struct Order {
    #[serde(rename = "_id")]
    id: ObjectId,
    total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Entity)]
#[entity(name = "Customer")]
struct CustomerRecord {
    #[entity(id)]
    #[serde(rename = "_id")]
    key: String,
    name: String,
}

#[test]
fn id_field_is_used_by_default() {
    let id = ObjectId::new();
    let order = Order { id, total: 12 };

    assert_eq!(order.id(), Bson::ObjectId(id));
    assert_eq!(Order::entity_name(), "Order");
}

#[test]
fn marked_field_and_name_override() {
    let record = CustomerRecord {
        key: "c-42".to_string(),
        name: "Alice".to_string(),
    };

    assert_eq!(record.id(), Bson::String("c-42".to_string()));
    assert_eq!(CustomerRecord::entity_name(), "Customer");
}

#[test]
fn derived_entity_serializes_with_store_id() {
    let record = CustomerRecord {
        key: "c-42".to_string(),
        name: "Alice".to_string(),
    };

    let document = record.to_document().unwrap();

    assert_eq!(document.get("_id"), Some(&record.id()));
    assert_eq!(CustomerRecord::from_document(document).unwrap().name, "Alice");
}
