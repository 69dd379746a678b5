use super::*;
use pretty_assertions::assert_eq;

fn sample_dict() -> Value {
    let mut d = Dict::new();
    d.insert("b".to_string(), Value::string("two"));
    d.insert("a".to_string(), Value::Int(1));
    Value::dict(d)
}

#[test]
fn test_to_str_scalars() {
    assert_eq!(Value::Null.to_str(), "");
    assert_eq!(Value::Bool(true).to_str(), "true");
    assert_eq!(Value::Int(-3).to_str(), "-3");
    assert_eq!(Value::UInt(7).to_str(), "7");
    assert_eq!(Value::Double(1.5).to_str(), "1.5");
    assert_eq!(Value::string("hi").to_str(), "hi");
}

#[test]
fn test_to_str_containers() {
    let list = Value::list(vec![Value::Int(1), Value::string("x"), Value::Null]);
    assert_eq!(list.to_str(), r#"[1, "x", null]"#);
    assert_eq!(sample_dict().to_str(), r#"{"a" : 1, "b" : "two"}"#);
}

#[test]
fn test_clone_aliases_container() {
    let list = Value::list(vec![Value::Int(1)]);
    let alias = list.clone();
    if let Value::List(items) = &list {
        items.write().push(Value::Int(2));
    }
    assert_eq!(alias.to_str(), "[1, 2]");
}

#[test]
fn test_freeze_is_independent() {
    let inner = Value::list(vec![Value::Int(1)]);
    let outer = Value::list(vec![inner.clone()]);
    let frozen = outer.freeze();

    if let Value::List(items) = &inner {
        items.write().push(Value::Int(2));
    }

    assert_eq!(outer.to_str(), "[[1, 2]]");
    assert_eq!(frozen.to_str(), "[[1]]");
}

#[test]
fn test_to_uint_coercions() {
    assert_eq!(Value::UInt(5).to_uint(), Some(5));
    assert_eq!(Value::Int(5).to_uint(), Some(5));
    assert_eq!(Value::Int(-1).to_uint(), None);
    assert_eq!(Value::string(" 12 ").to_uint(), Some(12));
    assert_eq!(Value::string("abc").to_uint(), None);
    assert_eq!(Value::Double(1.0).to_uint(), None);
    assert_eq!(Value::Null.to_uint(), None);
}

#[test]
fn test_to_double_coercions() {
    assert_eq!(Value::Int(2).to_double(), Some(2.0));
    assert_eq!(Value::string("0.25").to_double(), Some(0.25));
    assert_eq!(Value::list(vec![]).to_double(), None);
}

#[test]
fn test_truthiness() {
    assert!(!Value::Null.to_bool());
    assert!(!Value::string("").to_bool());
    assert!(Value::string("x").to_bool());
    assert!(!Value::list(vec![]).to_bool());
    assert!(sample_dict().to_bool());
    assert!(!Value::error("bad", None).to_bool());
}

#[test]
fn test_structural_equality() {
    assert_eq!(sample_dict(), sample_dict());
    assert_ne!(Value::Int(1), Value::UInt(1));
    assert_eq!(
        Value::list(vec![Value::Int(1)]),
        Value::list(vec![Value::Int(1)])
    );
}
