use std::fmt;

/// Dense handle to a node in a [`crate::SpecGraph`].
///
/// Ids are assigned in creation order and never reused; a node outlives every
/// change to its bases.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(u32);

impl SpecId {
	/// The root capability node every graph starts with.
	pub const ROOT: SpecId = SpecId(0);

	#[inline]
	pub const fn from_u32(raw: u32) -> Self {
		Self(raw)
	}

	#[inline]
	pub const fn as_u32(self) -> u32 {
		self.0
	}

	#[inline]
	pub(crate) const fn index(self) -> usize {
		self.0 as usize
	}
}

impl fmt::Debug for SpecId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SpecId({})", self.0)
	}
}

impl fmt::Display for SpecId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// What a lattice node stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecKind {
	/// Plain specification node.
	Specification,
	/// Named capability.
	Interface,
	/// Unordered aggregate of interfaces claimed by an object or factory.
	Declaration,
}
