#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use crate::behaviors::{GradientPulse, Generic, Sequence};
use crate::{AttrError, EngineOptions, EvalStrategy, ObserveCandidate, SimContext, ValueKind};

fn context() -> SimContext {
    SimContext::new(EngineOptions::default().with_strategy(EvalStrategy::Interpreted))
}

#[test]
fn test_base_attributes_declared_on_creation() {
    let mut ctx = context();
    let seq = ctx.add_module(None, "S1", Sequence).unwrap();
    let generic = ctx.add_module(None, "X", Generic).unwrap();

    assert_eq!(ctx.get::<String>(seq, "Name").unwrap(), "S1");
    assert!(ctx.is_observable(seq, "Duration"));
    assert!(!ctx.is_observable(seq, "Observe"));
    assert!(!ctx.is_observable(seq, "Vector"));
    assert!(ctx.find_attribute(generic, "Duration").is_none());
    assert_eq!(ctx.module(generic).unwrap().class_name(), "Generic");
}

#[test]
fn test_typed_get_and_write() {
    let mut ctx = context();
    let g = ctx.add_module(None, "G1", GradientPulse).unwrap();

    assert!(ctx.write(g, "Duration", 5.0).unwrap());
    assert!(!ctx.write(g, "Duration", 5.0).unwrap());
    assert_eq!(ctx.get::<f64>(g, "Duration").unwrap(), 5.0);

    assert_eq!(
        ctx.write(g, "Duration", 1i32),
        Err(AttrError::TypeMismatch {
            name: "Duration".into(),
            expected: ValueKind::Double,
            found: ValueKind::Int,
        })
    );
    assert_eq!(
        ctx.get::<f64>(g, "Nope"),
        Err(AttrError::UnknownAttribute {
            module: "G1".into(),
            name: "Nope".into(),
        })
    );
    assert!(!ctx.has_formula(g, "Duration"));
}

#[test]
fn test_hide_attribute() {
    let mut ctx = context();
    let g = ctx.add_module(None, "G1", GradientPulse).unwrap();
    let area = ctx.find_attribute(g, "Area").unwrap();
    assert!(ctx.attribute(area).unwrap().is_public());

    ctx.hide_attribute(g, "Area", false).unwrap();
    let attribute = ctx.attribute(area).unwrap();
    assert!(!attribute.is_public());
    assert!(!attribute.is_observable());
    // Unobservable attributes never report a change.
    assert!(!ctx.write(g, "Area", 3.0).unwrap());
    assert_eq!(ctx.get::<f64>(g, "Area").unwrap(), 3.0);

    ctx.hide_attribute(g, "Area", true).unwrap();
    assert!(ctx.is_observable(g, "Area"));
    assert!(ctx.hide_attribute(g, "Missing", true).is_err());
}

#[test]
fn test_tree_navigation() {
    let mut ctx = context();
    let root = ctx.add_module(None, "Root", Sequence).unwrap();
    let a = ctx.add_module(Some(root), "A", GradientPulse).unwrap();
    let b = ctx.add_module(Some(root), "B", GradientPulse).unwrap();

    assert_eq!(ctx.roots(), &[root]);
    assert_eq!(ctx.children(root), &[a, b]);
    assert_eq!(ctx.parent(b), Some(root));
    assert_eq!(ctx.parent(root), None);
    assert_eq!(ctx.find_module("B"), Some(b));
    assert_eq!(ctx.lookup("A", "Area"), ctx.find_attribute(a, "Area"));
    assert_eq!(ctx.modules().count(), 3);
    assert_eq!(ctx.symbol_of(ctx.lookup("A", "SlewRate").unwrap()).unwrap(), "a_slewrate");
}

#[test]
fn test_add_under_removed_parent_fails() {
    let mut ctx = context();
    let root = ctx.add_module(None, "Root", Sequence).unwrap();
    assert!(ctx.remove_module(root));
    assert_eq!(
        ctx.add_module(Some(root), "Child", Generic),
        Err(AttrError::UnknownModule(root))
    );
}

#[test]
fn test_remove_module_detaches_edges() {
    let mut ctx = context();
    let root = ctx.add_module(None, "Root", Sequence).unwrap();
    let g1 = ctx.add_module(Some(root), "G1", GradientPulse).unwrap();
    let g2 = ctx.add_module(Some(root), "G2", GradientPulse).unwrap();
    let duration = ctx.find_attribute(g1, "Duration").unwrap();
    let area = ctx.find_attribute(g2, "Area").unwrap();

    ctx.write(g1, "Duration", 5.0).unwrap();
    ctx.set_member(area, "a1*2", &[ObserveCandidate::new(duration, "a1")])
        .unwrap();
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
    assert_eq!(ctx.attribute(duration).unwrap().observers(), &[area]);

    let before = ctx.attribute_count();
    assert!(ctx.remove_module(g1));
    assert!(!ctx.remove_module(g1));
    assert!(ctx.attribute(duration).is_none());
    assert!(ctx.attribute_count() < before);
    assert_eq!(ctx.children(root), &[g2]);

    let attribute = ctx.attribute(area).unwrap();
    assert!(attribute.subjects().is_empty());
    assert!(attribute.has_formula());
    assert!(ctx.eval_expression(area).is_err());
    assert_eq!(ctx.get::<f64>(g2, "Area").unwrap(), 10.0);
}

#[test]
fn test_remove_subtree() {
    let mut ctx = context();
    let root = ctx.add_module(None, "Root", Sequence).unwrap();
    let child = ctx.add_module(Some(root), "Child", Sequence).unwrap();
    let leaf = ctx.add_module(Some(child), "Leaf", GradientPulse).unwrap();
    let other = ctx.add_module(None, "Other", Generic).unwrap();

    assert!(ctx.remove_module(root));
    assert!(ctx.module(child).is_none());
    assert!(ctx.module(leaf).is_none());
    assert_eq!(ctx.roots(), &[other]);
    assert_eq!(ctx.module_count(), 1);
}
