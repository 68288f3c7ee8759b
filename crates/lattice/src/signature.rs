//! Callable shape descriptions and compatibility checks.
//!
//! A [`SignatureInfo`] records the parameter shape a capability member
//! declares. Candidates report their own shape through [`Parameters`] (one
//! callable) or [`Members`] (a named set of callables) and are checked with
//! [`Compatibility`]. Nothing here reflects over host values; callers hand in
//! the shapes.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Kind of one positional slot in a callable shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
	Required,
	Optional,
	Rest,
	Block,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Param {
	name: Arc<str>,
	kind: ParamKind,
}

/// Declared shape of a capability member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureInfo {
	params: Vec<Param>,
	block: Option<Arc<str>>,
}

impl SignatureInfo {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a required parameter.
	pub fn param(mut self, name: &str) -> Self {
		self.push(name, ParamKind::Required);
		self
	}

	/// Appends a parameter that has a default value.
	pub fn param_with_default(mut self, name: &str) -> Self {
		self.push(name, ParamKind::Optional);
		self
	}

	/// Appends a variadic parameter.
	pub fn splat(mut self, name: &str) -> Self {
		self.push(name, ParamKind::Rest);
		self
	}

	/// Declares the trailing block parameter. A later call replaces it.
	pub fn block(mut self, name: &str) -> Self {
		self.block = Some(Arc::from(name));
		self
	}

	fn push(&mut self, name: &str, kind: ParamKind) {
		self.params.push(Param {
			name: Arc::from(name),
			kind,
		});
	}

	pub fn block_name(&self) -> Option<&str> {
		self.block.as_deref()
	}

	pub fn param_names(&self) -> impl Iterator<Item = &str> {
		self.params.iter().map(|p| &*p.name)
	}

	/// Declared slots, block last.
	pub fn kinds(&self) -> Vec<ParamKind> {
		let mut out: Vec<_> = self.params.iter().map(|p| p.kind).collect();
		if self.block.is_some() {
			out.push(ParamKind::Block);
		}
		out
	}

	/// Whether a callable with slots `actual` satisfies this shape.
	///
	/// Slots are compared position by position. A declared required slot
	/// accepts a required or optional actual slot; every other slot must
	/// match exactly. When that fails, the candidate is retried with its
	/// trailing block and trailing optional slots dropped.
	pub fn matches(&self, actual: &[ParamKind]) -> bool {
		let declared = self.kinds();
		slots_match(&declared, actual) || slots_match(&declared, without_trailing_defaults(actual))
	}
}

fn slots_match(declared: &[ParamKind], actual: &[ParamKind]) -> bool {
	declared.len() == actual.len()
		&& declared.iter().zip(actual).all(|(&want, &got)| {
			want == got
				|| (want == ParamKind::Required && matches!(got, ParamKind::Required | ParamKind::Optional))
		})
}

fn without_trailing_defaults(mut actual: &[ParamKind]) -> &[ParamKind] {
	if let [rest @ .., ParamKind::Block] = actual {
		actual = rest;
	}
	while let [rest @ .., ParamKind::Optional] = actual {
		actual = rest;
	}
	actual
}

/// A callable that can report its parameter shape.
pub trait Parameters {
	fn parameters(&self) -> Cow<'_, [ParamKind]>;
}

impl Parameters for [ParamKind] {
	fn parameters(&self) -> Cow<'_, [ParamKind]> {
		Cow::Borrowed(self)
	}
}

impl Parameters for Vec<ParamKind> {
	fn parameters(&self) -> Cow<'_, [ParamKind]> {
		Cow::Borrowed(self)
	}
}

/// A candidate exposing named callables.
pub trait Members {
	/// Shape of member `name`, or `None` when the candidate lacks it.
	fn member(&self, name: &str) -> Option<Cow<'_, [ParamKind]>>;
}

impl<P: Parameters> Members for BTreeMap<String, P> {
	fn member(&self, name: &str) -> Option<Cow<'_, [ParamKind]>> {
		self.get(name).map(Parameters::parameters)
	}
}

/// Pluggable compatibility check between a declared shape and a candidate.
pub trait Compatibility<C: ?Sized> {
	fn is_compatible(&self, candidate: &C) -> bool;
}

impl<C: Parameters + ?Sized> Compatibility<C> for SignatureInfo {
	fn is_compatible(&self, candidate: &C) -> bool {
		self.matches(&candidate.parameters())
	}
}

/// Named member signatures a capability declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberShapes {
	members: BTreeMap<Arc<str>, SignatureInfo>,
}

impl MemberShapes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn member(mut self, name: &str, signature: SignatureInfo) -> Self {
		self.members.insert(Arc::from(name), signature);
		self
	}

	pub fn get(&self, name: &str) -> Option<&SignatureInfo> {
		self.members.get(name)
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	/// First member, in name order, that `candidate` lacks or implements with
	/// an incompatible shape.
	pub fn first_mismatch<C: Members + ?Sized>(&self, candidate: &C) -> Option<&str> {
		self.members
			.iter()
			.find(|(name, signature)| {
				candidate
					.member(name)
					.is_none_or(|actual| !signature.matches(&actual))
			})
			.map(|(name, _)| &**name)
	}
}

impl<C: Members + ?Sized> Compatibility<C> for MemberShapes {
	fn is_compatible(&self, candidate: &C) -> bool {
		self.first_mismatch(candidate).is_none()
	}
}
