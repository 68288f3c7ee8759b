//! Composite dispatch keys.

use std::fmt;
use std::sync::Arc;

use concord_lattice::{SpecGraph, SpecId};
use smallvec::SmallVec;

use crate::RegistryError;

/// Required dimensions of a key. Most registrations have one or two.
pub type Required = SmallVec<[SpecId; 2]>;

/// One level of the nested registration map.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Segment {
	Spec(SpecId),
	Name(Arc<str>),
}

impl fmt::Debug for Segment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Segment::Spec(id) => write!(f, "{id}"),
			Segment::Name(name) => write!(f, "{name:?}"),
		}
	}
}

/// Normalized `(required, provided, name)` triple.
///
/// An empty required list becomes a single wildcard dimension holding the
/// root spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationKey {
	pub required: Required,
	pub provided: SpecId,
	pub name: Arc<str>,
}

impl RegistrationKey {
	pub fn new(required: &[SpecId], provided: SpecId, name: &str) -> Self {
		Self {
			required: normalize_required(required),
			provided,
			name: Arc::from(name),
		}
	}

	/// Number of required dimensions.
	pub fn order(&self) -> usize {
		self.required.len()
	}

	/// Checks every spec against `graph` and the order against `max_order`.
	pub fn validate(&self, graph: &SpecGraph, max_order: usize) -> Result<(), RegistryError> {
		if self.order() > max_order {
			return Err(RegistryError::OrderTooLarge {
				order: self.order(),
				max: max_order,
			});
		}
		match self
			.required
			.iter()
			.chain([&self.provided])
			.find(|&&spec| !graph.contains(spec))
		{
			Some(&spec) => Err(RegistryError::UnknownSpec { spec }),
			None => Ok(()),
		}
	}

	/// Path of the key in the nested map: required specs, provided, name.
	pub fn segments(&self) -> SmallVec<[Segment; 4]> {
		let mut out = prefix_segments(&self.required, self.provided);
		out.push(Segment::Name(self.name.clone()));
		out
	}
}

pub(crate) fn normalize_required(required: &[SpecId]) -> Required {
	if required.is_empty() {
		smallvec::smallvec![SpecId::ROOT]
	} else {
		Required::from_slice(required)
	}
}

/// Path of the sub-map holding every name registered for a
/// `(required, provided)` pair.
pub(crate) fn prefix_segments(required: &[SpecId], provided: SpecId) -> SmallVec<[Segment; 4]> {
	required
		.iter()
		.chain([&provided])
		.map(|&spec| Segment::Spec(spec))
		.collect()
}
