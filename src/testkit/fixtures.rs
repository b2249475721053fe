//! Builders for vendor JSON payloads and connection settings.

use serde_json::{json, Value};

use crate::app::models::{Connection, Record};

pub const BASE_URL: &str = "https://archer.test";

/// Connection with a password and no session token.
pub fn connection() -> Connection {
    Connection::new(BASE_URL, "Prod", "analyst").with_password("s3cret")
}

/// Connection for a different user on the same instance.
pub fn connection_for(username: &str) -> Connection {
    Connection::new(BASE_URL, "Prod", username).with_password("s3cret")
}

/// Wrap each item as `{RequestedObject, IsSuccessful: true, IsDeleted: false}`.
pub fn wrapped(items: Vec<Value>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| json!({"RequestedObject": item, "IsSuccessful": true, "IsDeleted": false}))
            .collect(),
    )
}

/// Successful login body.
pub fn login_ok(token: &str) -> Value {
    json!({
        "IsSuccessful": true,
        "RequestedObject": {"SessionToken": token},
        "ValidationMessages": []
    })
}

/// Rejected login body.
pub fn login_rejected(messages: &[&str]) -> Value {
    let messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({"ResourcedMessage": m}))
        .collect();
    json!({
        "IsSuccessful": false,
        "RequestedObject": null,
        "ValidationMessages": messages
    })
}

pub fn application(id: i64, name: &str) -> Value {
    json!({"Id": id, "Name": name, "Alias": name.replace(' ', "_"), "Status": 1})
}

pub fn level(id: i64, name: &str, alias: &str, module_id: i64) -> Value {
    json!({"Id": id, "Name": name, "Alias": alias, "ModuleId": module_id, "IsDeleted": false})
}

pub fn level_with_module(id: i64, alias: &str, module_name: &str, module_id: i64) -> Value {
    json!({
        "Id": id, "Name": module_name, "Alias": alias,
        "ModuleId": module_id, "ModuleName": module_name, "IsDeleted": false
    })
}

pub fn field(id: i64, name: &str, alias: &str, type_code: i64) -> Value {
    json!({
        "Id": id, "Name": name, "Alias": alias, "Type": type_code,
        "IsActive": true, "Status": 1, "Guid": format!("guid-{id}")
    })
}

pub fn inactive_field(id: i64, name: &str, alias: &str) -> Value {
    json!({"Id": id, "Name": name, "Alias": alias, "Type": 1, "IsActive": false, "Status": 1})
}

/// ContentAPI `{value: [...]}` body.
pub fn odata(records: Vec<Value>) -> Value {
    json!({ "value": records })
}

/// `count` numbered records starting at `first_id`.
pub fn records(first_id: usize, count: usize) -> Vec<Value> {
    (first_id..first_id + count)
        .map(|id| json!({"Id": id, "Title": format!("Record {id}")}))
        .collect()
}

/// Object literal as a [`Record`].
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture record must be an object, got {other}"),
    }
}
