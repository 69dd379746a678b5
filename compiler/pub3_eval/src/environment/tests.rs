use super::*;
use pretty_assertions::assert_eq;

fn env() -> Environment {
    let universals = Universals::new();
    universals.seed([("site".to_string(), Value::string("example"))]);
    Environment::new(universals)
}

#[test]
fn test_lookup_walks_outward() {
    let mut env = env();
    env.define("x", Value::Int(1));
    env.push_scope();
    env.define("y", Value::Int(2));

    assert_eq!(env.lookup("x"), Some(Value::Int(1)));
    assert_eq!(env.lookup("y"), Some(Value::Int(2)));
    assert_eq!(env.lookup("site"), Some(Value::string("example")));
    assert_eq!(env.lookup("nope"), None);
}

#[test]
fn test_inner_shadows_outer() {
    let mut env = env();
    env.define("x", Value::Int(1));
    env.push_scope();
    env.define("x", Value::Int(2));
    assert_eq!(env.lookup("x"), Some(Value::Int(2)));
    env.pop_scope();
    assert_eq!(env.lookup("x"), Some(Value::Int(1)));
}

#[test]
fn test_globals_never_popped() {
    let mut env = env();
    env.define("g", Value::Int(1));
    env.pop_scope();
    env.pop_scope();
    assert_eq!(env.depth(), 1);
    assert_eq!(env.lookup("g"), Some(Value::Int(1)));
}

#[test]
fn test_assign_updates_existing_binding() {
    let mut env = env();
    env.define("x", Value::Int(1));
    env.push_scope();
    env.assign("x", Value::Int(5));
    env.pop_scope();
    assert_eq!(env.lookup("x"), Some(Value::Int(5)));
}

#[test]
fn test_assign_defines_innermost_when_absent() {
    let mut env = env();
    env.push_scope();
    env.assign("fresh", Value::Int(3));
    assert_eq!(env.lookup("fresh"), Some(Value::Int(3)));
    env.pop_scope();
    assert_eq!(env.lookup("fresh"), None);
}

#[test]
fn test_assign_never_writes_universals() {
    let mut env = env();
    env.assign("site", Value::string("local"));
    assert_eq!(env.lookup("site"), Some(Value::string("local")));
    assert_eq!(env.universals().get("site"), Some(Value::string("example")));
}

#[test]
fn test_barrier_hides_caller_locals() {
    let mut env = env();
    env.define_global("g", Value::Int(1));
    env.push_scope();
    env.define("caller_local", Value::Int(2));

    let mut params = BindTab::default();
    params.insert("p".to_string(), Value::Int(3));
    env.push_barrier(params);

    assert_eq!(env.lookup("p"), Some(Value::Int(3)));
    assert_eq!(env.lookup("g"), Some(Value::Int(1)));
    assert_eq!(env.lookup("caller_local"), None);

    env.pop_scope();
    assert_eq!(env.lookup("caller_local"), Some(Value::Int(2)));
}

#[test]
fn test_truncate_restores_depth() {
    let mut env = env();
    let depth = env.depth();
    env.push_scope();
    env.push_barrier(BindTab::default());
    env.push_scope();
    env.truncate(depth);
    assert_eq!(env.depth(), depth);
    env.truncate(0);
    assert_eq!(env.depth(), 1);
}

#[test]
fn test_capture_is_frozen_and_skips_globals() {
    let mut env = env();
    env.define_global("g", Value::Int(1));
    env.push_scope();
    let list = Value::list(vec![Value::Int(1)]);
    env.define("xs", list.clone());

    let captured = env.capture();
    assert!(!captured.contains_key("g"));

    if let Value::List(items) = &list {
        items.write().push(Value::Int(2));
    }
    assert_eq!(captured.get("xs").map(Value::to_str), Some("[1]".to_string()));
}

#[test]
fn test_capture_inner_shadows_outer() {
    let mut env = env();
    env.push_scope();
    env.define("x", Value::Int(1));
    env.push_scope();
    env.define("x", Value::Int(2));
    assert_eq!(env.capture().get("x"), Some(&Value::Int(2)));
}

#[test]
fn test_into_globals() {
    let mut env = env();
    env.define_global("a", Value::Int(1));
    env.push_scope();
    env.define("b", Value::Int(2));
    let globals = env.into_globals();
    assert_eq!(globals.len(), 1);
    assert_eq!(globals.get("a"), Some(&Value::Int(1)));
}
