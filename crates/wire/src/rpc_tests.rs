// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_with_no_id_is_a_notification() {
    let req = RpcRequest::notification("workflow.nodeStarted", serde_json::json!({}));
    assert!(req.is_notification());
}

#[test]
fn request_with_id_is_not_a_notification() {
    let req = RpcRequest::call(RequestId::Number(1), "jobs.list", serde_json::json!({}));
    assert!(!req.is_notification());
}

#[test]
fn success_response_serializes_without_error_field() {
    let resp = RpcResponse::success(RequestId::Number(1), serde_json::json!({"pong": true}));
    let value = serde_json::to_value(&resp).unwrap();
    assert!(value.get("error").is_none());
    assert_eq!(value["result"]["pong"], true);
}

#[test]
fn failure_response_serializes_without_result_field() {
    let resp = RpcResponse::failure(RequestId::Number(1), RpcError::method_not_found("nope"));
    let value = serde_json::to_value(&resp).unwrap();
    assert!(value.get("result").is_none());
    assert_eq!(value["error"]["code"], error_code::METHOD_NOT_FOUND);
}

#[test]
fn string_and_numeric_ids_round_trip() {
    let numeric: RequestId = serde_json::from_str("42").unwrap();
    assert_eq!(numeric, RequestId::Number(42));

    let string: RequestId = serde_json::from_str("\"req-1\"").unwrap();
    assert_eq!(string, RequestId::String("req-1".to_string()));
}

#[test]
fn method_not_found_uses_the_reserved_code() {
    let err = RpcError::method_not_found("bogus.method");
    assert_eq!(err.code, -32601);
}
