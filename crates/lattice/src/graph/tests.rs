use pretty_assertions::assert_eq;

use super::SpecGraph;
use crate::{LatticeError, SpecId, SpecKind};

fn spec(g: &mut SpecGraph, name: &str, bases: &[SpecId]) -> SpecId {
	g.interface(name, bases).expect("consistent hierarchy")
}

#[test]
fn root_is_an_interface_with_itself_as_ancestry() {
	let g = SpecGraph::new();
	assert_eq!(g.kind(SpecId::ROOT), Some(SpecKind::Interface));
	assert_eq!(g.name(SpecId::ROOT), Some("Interface"));
	assert_eq!(g.ancestors(SpecId::ROOT), &[SpecId::ROOT]);
}

#[test]
fn empty_specification_has_only_itself() {
	let mut g = SpecGraph::new();
	let s = g.specification(&[]).unwrap();
	assert_eq!(g.ancestors(s), &[s]);
	assert!(g.extends(s, s));
	assert!(!g.extends(s, SpecId::ROOT));
}

#[test]
fn duplicate_bases_are_collapsed() {
	let mut g = SpecGraph::new();
	let a = spec(&mut g, "a", &[SpecId::ROOT]);
	let b = spec(&mut g, "b", &[a, a, SpecId::ROOT, a]);
	assert_eq!(g.bases(b), &[a, SpecId::ROOT]);
	assert_eq!(g.ancestors(b), &[b, a, SpecId::ROOT]);
}

#[test]
fn diamond_orders_local_bases_before_shared_root() {
	let mut g = SpecGraph::new();
	let root = SpecId::ROOT;
	let a = spec(&mut g, "a", &[root]);
	let b = spec(&mut g, "b", &[root]);
	let c = spec(&mut g, "c", &[root]);
	let d = spec(&mut g, "d", &[c, a]);
	let e = spec(&mut g, "e", &[c, b]);
	let f = spec(&mut g, "f", &[e, d]);
	assert_eq!(g.ancestors(f), &[f, e, d, c, b, a, root]);
}

#[test]
fn local_precedence_pulls_base_forward() {
	let mut g = SpecGraph::new();
	let root = SpecId::ROOT;
	let a = spec(&mut g, "a", &[root]);
	let b = spec(&mut g, "b", &[root]);
	let c = spec(&mut g, "c", &[root]);
	let d = spec(&mut g, "d", &[c, a]);
	let e = spec(&mut g, "e", &[b, c]);
	let f = spec(&mut g, "f", &[e, d]);
	assert_eq!(g.ancestors(f), &[f, e, b, d, c, a, root]);
}

#[test]
fn inconsistent_construction_inserts_nothing() {
	let mut g = SpecGraph::new();
	let root = SpecId::ROOT;
	let a = spec(&mut g, "a", &[root]);
	let b = spec(&mut g, "b", &[a, root]);
	let c = spec(&mut g, "c", &[root]);
	let d = spec(&mut g, "d", &[b, c]);
	let before = g.len();

	let err = g.interface("bad", &[c, b, d]).unwrap_err();
	assert!(matches!(err, LatticeError::InconsistentHierarchy { .. }));
	assert_eq!(g.len(), before);
	assert!(g.dependents(c).iter().all(|&dep| dep == d));
}

#[test]
fn unknown_base_is_invalid() {
	let mut g = SpecGraph::new();
	let bogus = SpecId::from_u32(99);
	assert_eq!(
		g.specification(&[bogus]),
		Err(LatticeError::InvalidBase { base: bogus })
	);
	let s = g.specification(&[]).unwrap();
	assert_eq!(
		g.set_bases(s, &[bogus]),
		Err(LatticeError::InvalidBase { base: bogus })
	);
}

#[test]
fn reassigning_bases_updates_dependents() {
	let mut g = SpecGraph::new();
	let s = g.specification(&[]).unwrap();
	let dependent = g.specification(&[s]).unwrap();
	let base = g.specification(&[]).unwrap();

	assert_eq!(g.revision(), 0);
	g.set_bases(s, &[base]).unwrap();
	assert_eq!(g.ancestors(dependent), &[dependent, s, base]);
	assert_eq!(g.dependents(base), vec![s]);
	assert_eq!(g.revision(), 1);
}

#[test]
fn change_two_levels_up_reaches_grandchildren() {
	let mut g = SpecGraph::new();
	let spec = g.specification(&[]).unwrap();
	let base1 = g.specification(&[]).unwrap();
	let base2 = g.specification(&[base1]).unwrap();
	g.set_bases(spec, &[base2]).unwrap();
	assert_eq!(g.ancestors(spec), &[spec, base2, base1]);

	g.set_bases(base2, &[]).unwrap();
	assert_eq!(g.ancestors(spec), &[spec, base2]);
}

#[test]
fn old_bases_are_no_longer_extended() {
	let mut g = SpecGraph::new();
	let spec = g.specification(&[]).unwrap();
	let old_base = g.specification(&[]).unwrap();
	let new_base = g.specification(&[]).unwrap();
	g.set_bases(spec, &[old_base]).unwrap();
	g.set_bases(spec, &[new_base]).unwrap();

	assert!(!g.extends(spec, old_base));
	assert!(g.extends(spec, new_base));
	assert!(g.dependents(old_base).is_empty());
}

#[test]
fn clearing_bases_leaves_only_self() {
	let mut g = SpecGraph::new();
	let a = spec(&mut g, "a", &[SpecId::ROOT]);
	g.set_bases(a, &[]).unwrap();
	assert_eq!(g.ancestors(a), &[a]);
}

#[test]
fn failed_reassignment_keeps_previous_ancestry() {
	let mut g = SpecGraph::new();
	let root = SpecId::ROOT;
	let a = spec(&mut g, "a", &[root]);
	let b = spec(&mut g, "b", &[a]);
	let x = spec(&mut g, "x", &[root]);
	let before = g.ancestors(x).to_vec();

	assert!(matches!(
		g.set_bases(x, &[a, b]),
		Err(LatticeError::InconsistentHierarchy { .. })
	));
	assert_eq!(g.ancestors(x), &before[..]);
	assert_eq!(g.bases(x), &[root]);
	assert_eq!(g.revision(), 0);
	assert!(!g.dependents(a).contains(&x));
}

#[test]
fn failure_in_a_dependent_rolls_back_the_whole_change() {
	let mut g = SpecGraph::new();
	let root = SpecId::ROOT;
	let p = spec(&mut g, "p", &[root]);
	let m = spec(&mut g, "m", &[root]);
	// child lists m before p; making m descend from p breaks it.
	let child = spec(&mut g, "child", &[m, p]);
	let child_before = g.ancestors(child).to_vec();

	let err = g.set_bases(p, &[m]).unwrap_err();
	assert_eq!(err, LatticeError::InconsistentHierarchy { spec: child });
	assert_eq!(g.bases(p), &[root]);
	assert_eq!(g.ancestors(child), &child_before[..]);
}

#[test]
fn cycles_are_rejected() {
	let mut g = SpecGraph::new();
	let a = g.specification(&[]).unwrap();
	let b = g.specification(&[a]).unwrap();
	let c = g.specification(&[b]).unwrap();

	assert_eq!(
		g.set_bases(a, &[c]),
		Err(LatticeError::CyclicBase { spec: a, base: c })
	);
	assert_eq!(
		g.set_bases(a, &[a]),
		Err(LatticeError::CyclicBase { spec: a, base: a })
	);
}

#[test]
fn observers_do_not_count_as_cycles() {
	let mut g = SpecGraph::new();
	let a = g.specification(&[]).unwrap();
	let watcher = g.specification(&[]).unwrap();
	g.subscribe(a, watcher).unwrap();

	g.set_bases(a, &[watcher]).unwrap();
	assert_eq!(g.ancestors(a), &[a, watcher]);
	assert_eq!(
		g.set_bases(watcher, &[a]),
		Err(LatticeError::CyclicBase { spec: watcher, base: a })
	);
}

#[test]
fn iro_filters_non_interfaces() {
	let mut g = SpecGraph::new();
	let iface = spec(&mut g, "iface", &[SpecId::ROOT]);
	let plain = g.specification(&[iface]).unwrap();
	let top = spec(&mut g, "top", &[plain]);
	assert_eq!(g.iro(top), vec![top, iface, SpecId::ROOT]);
}

#[test]
fn extra_subscriber_is_recomputed_on_change() {
	let mut g = SpecGraph::new();
	let a = g.specification(&[]).unwrap();
	let observer = g.specification(&[]).unwrap();
	g.subscribe(a, observer).unwrap();
	assert_eq!(g.dependents(a), vec![observer]);
	g.set_bases(a, &[]).unwrap();
	assert_eq!(g.ancestors(observer), &[observer]);

	assert!(g.unsubscribe(a, observer));
	assert!(g.dependents(a).is_empty());
}

#[test]
fn structural_edges_cannot_be_unsubscribed() {
	let mut g = SpecGraph::new();
	let a = g.specification(&[]).unwrap();
	let b = g.specification(&[a]).unwrap();
	assert!(!g.unsubscribe(a, b));
	assert_eq!(g.dependents(a), vec![b]);
}

mod declarations {
	use pretty_assertions::assert_eq;

	use super::spec;
	use crate::{SpecGraph, SpecId};

	#[test]
	fn declaration_aggregates_interfaces() {
		let mut g = SpecGraph::new();
		let i1 = spec(&mut g, "i1", &[SpecId::ROOT]);
		let i2 = spec(&mut g, "i2", &[SpecId::ROOT]);
		let d = g.declaration(&[i1, i2]).unwrap();
		assert_eq!(g.interfaces(d), vec![i1, i2]);
		assert!(g.extends(d, i1));
		assert!(g.extends(d, d));
		// Reachable through ancestry but never declared.
		assert!(!g.extends(d, SpecId::ROOT));
	}

	#[test]
	fn members_are_ordered_specific_first() {
		let mut g = SpecGraph::new();
		let base = spec(&mut g, "base", &[SpecId::ROOT]);
		let derived = spec(&mut g, "derived", &[base]);
		let d = g.declaration(&[base, derived]).unwrap();
		assert_eq!(g.bases(d), &[derived, base]);
		assert_eq!(g.ancestors(d), &[d, derived, base, SpecId::ROOT]);
	}

	#[test]
	fn crossed_member_orders_flatten_first_seen() {
		let mut g = SpecGraph::new();
		let a = spec(&mut g, "a", &[SpecId::ROOT]);
		let b = spec(&mut g, "b", &[SpecId::ROOT]);
		let ia = spec(&mut g, "ia", &[a, b]);
		let ib = spec(&mut g, "ib", &[b, a]);
		let d = g.declaration(&[ia, ib]).unwrap();
		assert_eq!(g.ancestors(d), &[d, ia, a, b, SpecId::ROOT, ib]);

		let later = g.declaration(&[]).unwrap();
		g.set_bases(later, &[ib, ia]).unwrap();
		assert_eq!(g.ancestors(later), &[later, ib, b, a, SpecId::ROOT, ia]);
	}

	#[test]
	fn union_keeps_left_then_new_right_members() {
		let mut g = SpecGraph::new();
		let i1 = spec(&mut g, "i1", &[SpecId::ROOT]);
		let i2 = spec(&mut g, "i2", &[SpecId::ROOT]);
		let i3 = spec(&mut g, "i3", &[SpecId::ROOT]);
		let left = g.declaration(&[i1, i2]).unwrap();
		let right = g.declaration(&[i2, i3]).unwrap();
		let both = g.union(left, right).unwrap();
		assert_eq!(g.interfaces(both), vec![i1, i2, i3]);
	}

	#[test]
	fn difference_drops_members_extending_the_other_side() {
		let mut g = SpecGraph::new();
		let base = spec(&mut g, "base", &[SpecId::ROOT]);
		let derived = spec(&mut g, "derived", &[base]);
		let other = spec(&mut g, "other", &[SpecId::ROOT]);
		let d = g.declaration(&[derived, other]).unwrap();

		let without_base = g.difference(d, base).unwrap();
		assert_eq!(g.interfaces(without_base), vec![other]);

		let without_derived = g.difference(d, derived).unwrap();
		assert_eq!(g.interfaces(without_derived), vec![other]);
	}
}
