use crate::SpecId;

/// Errors raised while building or reshaping the lattice.
///
/// A failed mutation never publishes anything: the graph keeps the bases and
/// ancestry it had before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LatticeError {
	/// The bases cannot be merged into an order that keeps local precedence
	/// and monotonicity.
	#[error("inconsistent hierarchy: no linearization exists for {spec}")]
	InconsistentHierarchy { spec: SpecId },

	/// A base id does not name a node of this graph.
	#[error("invalid base {base}: not a specification of this lattice")]
	InvalidBase { base: SpecId },

	/// A base is the node itself or one of its dependents.
	#[error("cyclic base {base} for {spec}")]
	CyclicBase { spec: SpecId, base: SpecId },

	/// The node being reshaped does not exist.
	#[error("unknown specification {spec}")]
	UnknownSpec { spec: SpecId },
}
