use std::sync::Arc;

use concord_lattice::{Declarations, Lattice, SpecId};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::AdapterRegistry;
use crate::registration::{Factory, Registration};
use crate::{RegistryConfig, RegistryError};

type View = Factory<&'static str, String>;

struct Specs {
	ir1: SpecId,
	ir2: SpecId,
	ip1: SpecId,
	ip2: SpecId,
	ip3: SpecId,
}

fn setup() -> (AdapterRegistry<str>, Specs) {
	let lattice = Lattice::new();
	let root = SpecId::ROOT;
	let ir1 = lattice.interface("ir1", &[root]).unwrap();
	let ir2 = lattice.interface("ir2", &[ir1]).unwrap();
	let ip1 = lattice.interface("ip1", &[root]).unwrap();
	let ip2 = lattice.interface("ip2", &[ip1]).unwrap();
	let ip3 = lattice.interface("ip3", &[ip2]).unwrap();
	let registry = AdapterRegistry::new(lattice);
	let specs = Specs {
		ir1,
		ir2,
		ip1,
		ip2,
		ip3,
	};
	(registry, specs)
}

fn reg(required: &[SpecId], provided: SpecId, name: &str, value: &str) -> Registration<str> {
	Registration::new()
		.required_all(required)
		.provided(provided)
		.name(name)
		.value(Arc::from(value))
}

fn found(registry: &AdapterRegistry<str>, required: &[SpecId], provided: SpecId, name: &str) -> Option<String> {
	registry.lookup(required, provided, name).map(|v| v.to_string())
}

#[test]
fn lookup_through_required_and_provided_expansion() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();

	assert_eq!(found(&registry, &[s.ir1], s.ip2, ""), Some("12".into()));
	assert_eq!(found(&registry, &[s.ir2], s.ip2, ""), Some("12".into()));
	assert_eq!(found(&registry, &[s.ir2], s.ip1, ""), Some("12".into()));
	assert_eq!(found(&registry, &[SpecId::ROOT], s.ip1, ""), None);
	assert_eq!(found(&registry, &[s.ir1], s.ip3, ""), None);
}

#[test]
fn lookup_or_falls_back_to_default() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	let fallback: Arc<str> = Arc::from("42");
	assert_eq!(&*registry.lookup_or(&[SpecId::ROOT], s.ip1, "", fallback.clone()), "42");
	assert_eq!(&*registry.lookup_or(&[s.ir1], s.ip1, "", fallback), "12");
}

#[test]
fn names_partition_registrations() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, "bob"), None);
	registry.register(reg(&[s.ir1], s.ip2, "bob", "Bob's 12")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, "bob"), Some("Bob's 12".into()));
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("12".into()));
}

#[test]
fn nearer_provided_spec_wins() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	registry.register(reg(&[s.ir1], s.ip1, "", "11")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("11".into()));
	assert_eq!(found(&registry, &[s.ir1], s.ip2, ""), Some("12".into()));
}

#[test]
fn more_specific_required_spec_wins() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	registry.register(reg(&[s.ir2], s.ip2, "", "21")).unwrap();
	assert_eq!(found(&registry, &[s.ir2], s.ip1, ""), Some("21".into()));
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("12".into()));
}

#[test]
fn earlier_required_dimension_dominates() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir2, SpecId::ROOT], s.ip1, "", "first")).unwrap();
	registry.register(reg(&[s.ir1, s.ir2], s.ip1, "", "second")).unwrap();
	assert_eq!(found(&registry, &[s.ir2, s.ir2], s.ip1, ""), Some("first".into()));
}

#[test]
fn wildcard_required_is_the_default() {
	let (registry, s) = setup();
	registry.register(Registration::new().any().provided(s.ip1).value(Arc::from("default"))).unwrap();
	let iq = registry.lattice().interface("iq", &[SpecId::ROOT]).unwrap();
	assert_eq!(found(&registry, &[iq], s.ip1, ""), Some("default".into()));

	registry.register(reg(&[s.ir1], s.ip1, "", "specific")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("specific".into()));
	assert_eq!(found(&registry, &[iq], s.ip1, ""), Some("default".into()));
}

#[test]
fn empty_required_matches_any_single_object() {
	let (registry, s) = setup();
	registry.register(reg(&[], s.ip2, "", "null adapter")).unwrap();
	assert_eq!(found(&registry, &[], s.ip2, ""), Some("null adapter".into()));
	assert_eq!(found(&registry, &[], s.ip1, ""), Some("null adapter".into()));
	assert_eq!(found(&registry, &[s.ir2], s.ip1, ""), Some("null adapter".into()));
}

#[test]
fn orders_are_stored_apart() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip1, "", "one")).unwrap();
	registry.register(reg(&[s.ir1, s.ir1], s.ip1, "", "two")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("one".into()));
	assert_eq!(found(&registry, &[s.ir1, s.ir1], s.ip1, ""), Some("two".into()));
	assert_eq!(found(&registry, &[s.ir1, s.ir1, s.ir1], s.ip1, ""), None);
}

#[test]
fn lookup_all_merges_general_then_specific() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip1, "", "1")).unwrap();
	registry.register(reg(&[s.ir1], s.ip1, "bob", "2")).unwrap();
	registry.register(reg(&[s.ir2], s.ip1, "bob", "bob for ir2")).unwrap();

	let all: Vec<_> = registry
		.lookup_all(&[s.ir2], s.ip1)
		.into_iter()
		.map(|(name, value)| (name.to_string(), value.to_string()))
		.collect();
	assert_eq!(
		all,
		vec![
			(String::new(), String::from("1")),
			(String::from("bob"), String::from("bob for ir2")),
		]
	);
	assert!(registry.lookup_all(&[], s.ip1).is_empty());
	assert!(registry.lookup_all(&[s.ir1], s.ip3).is_empty());
}

#[test]
fn exact_views_do_not_expand() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	registry.register(reg(&[s.ir1], s.ip2, "bob", "Bob's 12")).unwrap();
	registry.register(reg(&[s.ir1], s.ip1, "", "11")).unwrap();

	assert_eq!(registry.first(&[s.ir1], s.ip1, "").as_deref(), Some("11"));
	assert_eq!(registry.first(&[s.ir1], s.ip2, "bob").as_deref(), Some("Bob's 12"));
	assert_eq!(registry.first(&[s.ir2], s.ip2, ""), None);

	let names: Vec<_> = registry
		.all(&[s.ir1], s.ip2)
		.into_iter()
		.map(|(name, _)| name.to_string())
		.collect();
	assert_eq!(names, vec!["", "bob"]);
	assert!(registry.all(&[s.ir2], s.ip2).is_empty());
}

#[test]
fn reregistering_replaces_and_returns_the_old_value() {
	let (registry, s) = setup();
	assert_eq!(registry.register(reg(&[s.ir1], s.ip1, "", "old")).unwrap(), None);
	let replaced = registry.register(reg(&[s.ir1], s.ip1, "", "new")).unwrap();
	assert_eq!(replaced.as_deref(), Some("old"));
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("new".into()));
}

#[test]
fn unregister_matches_by_identity() {
	let (registry, s) = setup();
	let f1: Arc<str> = Arc::from("f1");
	let f2: Arc<str> = Arc::from("f1");
	registry.register(reg(&[s.ir1], s.ip1, "", "x").value(f1.clone())).unwrap();

	assert_eq!(registry.unregister(&[s.ir1], s.ip1, "", Some(&f2)), None);
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("f1".into()));

	let removed = registry.unregister(&[s.ir1], s.ip1, "", Some(&f1));
	assert!(removed.is_some_and(|v| Arc::ptr_eq(&v, &f1)));
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), None);
}

#[test]
fn unregister_without_value_is_unconditional_and_idempotent() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	assert!(registry.unregister(&[s.ir1], s.ip2, "", None).is_some());
	assert!(registry.unregister(&[s.ir1], s.ip2, "", None).is_none());
	assert!(registry.unregister(&[s.ir2, s.ir2], s.ip2, "", None).is_none());
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), None);
}

#[test]
fn unregistering_one_name_keeps_provided_spec_reachable() {
	let (registry, s) = setup();
	registry.register(reg(&[s.ir1], s.ip2, "", "12")).unwrap();
	registry.register(reg(&[s.ir1], s.ip2, "bob", "Bob's 12")).unwrap();
	registry.unregister(&[s.ir1], s.ip2, "bob", None);
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("12".into()));
}

#[test]
fn rebasing_a_provided_spec_moves_its_adapters() {
	let (registry, s) = setup();
	let lattice = registry.lattice().clone();
	let p3 = lattice.interface("p3", &[SpecId::ROOT]).unwrap();
	registry.register(reg(&[s.ir1], s.ip2, "", "F2")).unwrap();
	registry.register(reg(&[s.ir1], p3, "", "F3")).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("F2".into()));

	lattice.set_bases(s.ip2, &[SpecId::ROOT]).unwrap();
	assert!(!lattice.extends(s.ip2, s.ip1));
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), None);
	assert!(registry.lookup_all(&[s.ir1], s.ip1).is_empty());

	lattice.set_bases(p3, &[s.ip1]).unwrap();
	assert_eq!(found(&registry, &[s.ir1], s.ip1, ""), Some("F3".into()));
	assert_eq!(found(&registry, &[s.ir1], s.ip2, ""), Some("F2".into()));
	let all: Vec<_> = registry
		.lookup_all(&[s.ir1], s.ip1)
		.into_iter()
		.map(|(name, value)| (name.to_string(), value.to_string()))
		.collect();
	assert_eq!(all, vec![(String::from(""), String::from("F3"))]);
}

#[rstest]
#[case::missing_value(Registration::new().any(), RegistryError::MissingValue)]
#[case::unknown_required(
	Registration::new().required(SpecId::from_u32(99)).value(Arc::from("v")),
	RegistryError::UnknownSpec { spec: SpecId::from_u32(99) }
)]
#[case::unknown_provided(
	Registration::new().any().provided(SpecId::from_u32(98)).value(Arc::from("v")),
	RegistryError::UnknownSpec { spec: SpecId::from_u32(98) }
)]
#[case::too_wide(
	Registration::new().any().any().any().value(Arc::from("v")),
	RegistryError::OrderTooLarge { order: 3, max: 2 }
)]
fn rejected_registrations_leave_no_trace(#[case] registration: Registration<str>, #[case] expected: RegistryError) {
	let config = RegistryConfig {
		max_order: 2,
		..RegistryConfig::default()
	};
	let registry: AdapterRegistry<str> = AdapterRegistry::with_config(Lattice::new(), config);
	assert_eq!(registry.register(registration), Err(expected));
	assert!(registry.lookup_all(&[], SpecId::ROOT).is_empty());
}

#[test]
fn get_calls_the_factory_with_the_objects() {
	let lattice = Lattice::new();
	let ir1 = lattice.interface("ir1", &[SpecId::ROOT]).unwrap();
	let ip1 = lattice.interface("ip1", &[SpecId::ROOT]).unwrap();
	let decls: Declarations<&'static str> = Declarations::new(lattice.clone()).unwrap();
	decls.implements(&"Document", &[ir1]).unwrap();
	decls.bind(&"doc", &"Document").unwrap();

	let registry: AdapterRegistry<View> = AdapterRegistry::new(lattice);
	registry
		.register(
			Registration::<View>::new()
				.required(ir1)
				.provided(ip1)
				.handler(|objs: &[&'static str]| Some(format!("view of {}", objs[0]))),
		)
		.unwrap();
	registry
		.register(
			Registration::<View>::new()
				.required(ir1)
				.provided(ip1)
				.name("declines")
				.handler(|_: &[&'static str]| None),
		)
		.unwrap();

	assert_eq!(registry.get(&decls, &["doc"], ip1, ""), Some("view of doc".to_string()));
	assert_eq!(registry.get(&decls, &["stranger"], ip1, ""), None);
	assert_eq!(registry.get_or(&decls, &["doc"], ip1, "declines", "fallback".into()), "fallback");
}
