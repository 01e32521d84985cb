//! Dispatcher tests against services registered through the macros

use serde_json::{Value, json};
use thiserror::Error;

use crate::prelude::*;
use crate::{DispatchOptions, register_service};

#[derive(Debug, Error, RpcError)]
#[error("wrong pin")]
#[rpc_error(code = 1, message = "credential failure")]
struct CredentialError;

#[derive(Debug, Error)]
#[error("test throw")]
struct Untagged;

#[derive(Debug, Error, RpcError)]
#[error("{0}")]
#[rpc_error(code = 7)]
struct Described(String);

struct SimpleAddService;

#[rpc_service(errors(CredentialError, Described))]
impl SimpleAddService {
    #[rpc_method]
    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    #[rpc_method]
    pub async fn subtract(&self, a: i64, #[param(default = 1)] b: i64) -> i64 {
        a - b
    }

    #[rpc_method(name = "greet")]
    pub fn hello(&self, #[param(name = "who")] name: Option<String>) -> String {
        format!("hello {}", name.unwrap_or_else(|| "world".to_string()))
    }

    #[rpc_method]
    pub fn login(&self, pin: String) -> Result<bool, CredentialError> {
        if pin == "1234" { Ok(true) } else { Err(CredentialError) }
    }

    #[rpc_method]
    pub fn explode(&self) -> Result<(), Untagged> {
        Err(Untagged)
    }

    #[rpc_method]
    pub fn describe(&self, text: String) -> Result<(), Described> {
        Err(Described(text))
    }

    #[rpc_method]
    pub fn ping(&self) {}

    #[rpc_method]
    #[allow(dead_code)]
    fn private_function(&self) -> i64 {
        0
    }

    #[allow(dead_code)]
    pub fn not_rpc_function(&self) -> i64 {
        0
    }
}

struct Hidden;

#[rpc_service(exposed = false)]
impl Hidden {
    #[rpc_method]
    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }
}

#[derive(Default)]
struct Ledger {
    entries: Vec<i64>,
}

#[rpc_service]
impl Ledger {
    #[rpc_method]
    pub async fn append(&mut self, amount: i64) -> usize {
        let len = self.entries.len();
        // Yield between read and write so interleaving would be visible
        tokio::task::yield_now().await;
        self.entries.push(amount);
        len + 1
    }

    #[rpc_method]
    pub fn total(&self) -> i64 {
        self.entries.iter().sum()
    }
}

fn dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register_service(SimpleAddService).unwrap();
    dispatcher
}

async fn call(dispatcher: &Dispatcher, text: &str) -> Value {
    let reply = dispatcher.handle_text(text).await.expect("reply");
    serde_json::from_str(&reply).unwrap()
}

#[test]
fn test_registry_contents() {
    let descriptor = register_service(&SimpleAddService).unwrap();
    assert!(descriptor.is_service());
    assert_eq!(
        descriptor.method_names(),
        vec!["add", "describe", "explode", "greet", "login", "ping", "subtract"]
    );

    let subtract = descriptor.method("subtract").unwrap();
    let params = subtract.parameters();
    assert_eq!(params[1].name, "b");
    assert!(params[1].optional);
    assert!(!params[0].optional);

    let greet = descriptor.method("greet").unwrap();
    assert_eq!(greet.parameters()[0].name, "who");
    assert!(greet.parameters()[0].optional);

    assert_eq!(descriptor.errors().len(), 2);
    assert_eq!(descriptor, register_service(&SimpleAddService).unwrap());
}

#[tokio::test]
async fn test_add() {
    let reply = call(&dispatcher(), r#"{"method":"add","params":{"a":1,"b":2}}"#).await;
    assert_eq!(reply["result"], 3);
    assert!(reply.get("error").is_none());
}

#[tokio::test]
async fn test_subtract_uses_default() {
    let reply = call(&dispatcher(), r#"{"method":"subtract","params":{"a":5}}"#).await;
    assert_eq!(reply["result"], 4);
}

#[tokio::test]
async fn test_option_parameter_and_rename() {
    let d = dispatcher();
    assert_eq!(call(&d, r#"{"method":"greet","params":{"who":"bob"}}"#).await["result"], "hello bob");
    assert_eq!(call(&d, r#"{"method":"greet"}"#).await["result"], "hello world");
    assert_eq!(call(&d, r#"{"method":"hello"}"#).await["error"]["code"], -32601);
}

#[tokio::test]
async fn test_unit_return_is_null() {
    let reply = call(&dispatcher(), r#"{"method":"ping","id":1}"#).await;
    assert_eq!(reply, json!({"jsonrpc": "2.0", "result": null, "id": 1}));
}

#[tokio::test]
async fn test_error_mapping() {
    let d = dispatcher();
    assert_eq!(call(&d, r#"{"method":"login","params":{"pin":"1234"}}"#).await["result"], true);

    let reply = call(&d, r#"{"method":"login","params":{"pin":"0000"}}"#).await;
    assert_eq!(reply["error"], json!({"code": 1, "message": "credential failure"}));

    let reply = call(&d, r#"{"method":"explode"}"#).await;
    assert_eq!(reply["error"], json!({"code": -32603, "message": "Internal error"}));

    let reply = call(&d, r#"{"method":"describe","params":["custom text"]}"#).await;
    assert_eq!(reply["error"], json!({"code": 7, "message": "custom text"}));
}

#[tokio::test]
async fn test_only_public_marked_methods_are_callable() {
    let d = dispatcher();
    for method in ["private_function", "not_rpc_function", "unknown"] {
        let reply = call(&d, &format!(r#"{{"method":"{}","params":{{}}}}"#, method)).await;
        assert_eq!(reply["error"], json!({"code": -32601, "message": "Method not found"}));
    }
}

#[tokio::test]
async fn test_unexposed_service_rejects_calls() {
    let mut d = Dispatcher::new();
    d.register_service(Hidden).unwrap();
    let reply = call(&d, r#"{"method":"add","params":{"a":1,"b":2}}"#).await;
    assert_eq!(reply["error"]["code"], -32601);
}

#[tokio::test]
async fn test_protocol_errors() {
    let d = dispatcher();
    assert_eq!(call(&d, r#"{"method":"add","params":"#).await["error"]["code"], -32700);
    assert_eq!(call(&d, r#"{"method":"add","params":5}"#).await["error"]["code"], -32600);
    assert_eq!(call(&d, r#"{"method":"add","params":true}"#).await["error"]["code"], -32600);
    assert_eq!(call(&d, r#"{"params":{}}"#).await["error"]["code"], -32600);
    assert_eq!(call(&d, r#""add""#).await["error"]["code"], -32600);
    assert_eq!(call(&d, "[]").await["error"]["code"], -32600);

    let reply = call(&d, r#"{"method":"add","params":{"a":1}}"#).await;
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["data"], "missing required parameter `b`");

    let reply = call(&d, r#"{"method":"add","params":{"a":"x","b":2}}"#).await;
    assert_eq!(reply["error"]["code"], -32602);
    assert_eq!(reply["error"]["data"], "parameter `a` has the wrong type");
}

#[tokio::test]
async fn test_batch_preserves_order_and_length() {
    let reply = call(
        &dispatcher(),
        r#"[{"method":"add","params":{"a":1,"b":1}},{"method":"unknown","params":{}},5,{"method":"subtract","params":[10],"id":"s"}]"#,
    )
    .await;

    let replies = reply.as_array().unwrap();
    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["result"], 2);
    assert_eq!(replies[1]["error"]["code"], -32601);
    assert_eq!(replies[2]["error"]["code"], -32600);
    assert_eq!(replies[3], json!({"jsonrpc": "2.0", "result": 9, "id": "s"}));
}

#[tokio::test]
async fn test_exclusive_methods_do_not_interleave() {
    let mut d = Dispatcher::new();
    d.register_service(Ledger::default()).unwrap();
    let d = std::sync::Arc::new(d);

    let calls = (0..50).map(|i| {
        let d = std::sync::Arc::clone(&d);
        tokio::spawn(async move {
            d.handle_text(&format!(r#"{{"method":"append","params":[{}]}}"#, i)).await
        })
    });
    let mut positions: Vec<i64> = Vec::new();
    for handle in calls.collect::<Vec<_>>() {
        let reply: Value = serde_json::from_str(&handle.await.unwrap().unwrap()).unwrap();
        positions.push(reply["result"].as_i64().unwrap());
    }
    positions.sort_unstable();
    assert_eq!(positions, (1..=50).collect::<Vec<i64>>());

    let total = call(&d, r#"{"method":"total"}"#).await;
    assert_eq!(total["result"], (0..50).sum::<i64>());
}

#[tokio::test]
async fn test_strict_mode_from_options() {
    let mut d = Dispatcher::with_options(DispatchOptions {
        strict_notifications: true,
        ..DispatchOptions::default()
    });
    d.register_service(SimpleAddService).unwrap();
    assert!(d.handle_text(r#"{"method":"add","params":{"a":1,"b":2}}"#).await.is_none());
    // Invalid requests are still answered
    assert!(d.handle_text(r#"{"params":{}}"#).await.is_some());
}

#[derive(Default)]
struct Fragile {
    calls: i64,
}

#[rpc_service]
impl Fragile {
    #[rpc_method]
    pub fn checked(&self, a: i64, b: i64) -> i64 {
        a.checked_add(b).expect("sum overflowed")
    }

    #[rpc_method]
    pub async fn bump(&mut self, fail: bool) -> i64 {
        self.calls += 1;
        tokio::task::yield_now().await;
        if fail {
            panic!("bump failed after {} calls", self.calls);
        }
        self.calls
    }
}

#[tokio::test]
async fn test_panicking_method_becomes_internal_error() {
    let mut d = Dispatcher::new();
    d.register_service(Fragile::default()).unwrap();

    let reply = call(&d, r#"{"method":"checked","params":[9223372036854775807,1],"id":1}"#).await;
    assert_eq!(
        reply,
        json!({"jsonrpc": "2.0", "error": {"code": -32603, "message": "Internal error"}, "id": 1})
    );
    assert_eq!(call(&d, r#"{"method":"checked","params":[1,1]}"#).await["result"], 2);
}

#[tokio::test]
async fn test_panic_under_write_lock_releases_instance() {
    let mut d = Dispatcher::new();
    d.register_service(Fragile::default()).unwrap();

    let reply = call(&d, r#"{"method":"bump","params":[true],"id":"x"}"#).await;
    assert_eq!(reply["error"]["code"], -32603);
    assert_eq!(reply["id"], "x");

    // The lock is released and the instance keeps serving
    assert_eq!(call(&d, r#"{"method":"bump","params":[false]}"#).await["result"], 2);

    let batch = call(
        &d,
        r#"[{"method":"checked","params":[9223372036854775807,1]},{"method":"checked","params":[2,3]}]"#,
    )
    .await;
    assert_eq!(batch[0]["error"]["code"], -32603);
    assert_eq!(batch[1]["result"], 5);
}
