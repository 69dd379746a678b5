use super::*;

#[test]
fn test_expr_id_index() {
    let id = ExprId::new(7);
    assert_eq!(id.index(), 7);
    assert!(id.is_valid());
}

#[test]
fn test_expr_id_default_is_invalid() {
    let id = ExprId::default();
    assert!(!id.is_valid());
    assert_eq!(format!("{id:?}"), "ExprId::INVALID");
}

#[test]
fn test_stmt_id_debug() {
    assert_eq!(format!("{:?}", StmtId::new(3)), "StmtId(3)");
}
