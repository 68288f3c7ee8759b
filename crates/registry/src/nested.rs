//! Multi-segment key store with specificity-ranked expansion searches.
//!
//! # Role
//!
//! Registrations live at fixed-length segment paths. Besides exact CRUD the
//! map answers two searches where every key position is replaced by an
//! ordered list of acceptable substitutes:
//!
//! - [`NestedKeyMap::detect_expansion`] takes the first present substitute at
//!   each position and yields at most one node.
//! - [`NestedKeyMap::select_expansions`] follows every present substitute and
//!   yields every node reached, outer positions varying slowest.
//!
//! # Invariants
//!
//! - No empty branch survives a [`NestedKeyMap::delete`], except the root.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// One level of a [`NestedKeyMap`].
#[derive(Debug, Clone)]
pub enum Node<K, V> {
	Branch(FxHashMap<K, Node<K, V>>),
	Leaf(V),
}

impl<K, V> Node<K, V>
where
	K: Hash + Eq,
{
	fn branch() -> Self {
		Node::Branch(FxHashMap::default())
	}

	/// Child at `segment`. Leaves have no children.
	pub fn child(&self, segment: &K) -> Option<&Node<K, V>> {
		match self {
			Node::Branch(children) => children.get(segment),
			Node::Leaf(_) => None,
		}
	}

	pub fn leaf(&self) -> Option<&V> {
		match self {
			Node::Leaf(value) => Some(value),
			Node::Branch(_) => None,
		}
	}

	/// Children of a branch; empty for leaves.
	pub fn children(&self) -> impl Iterator<Item = (&K, &Node<K, V>)> {
		let map = match self {
			Node::Branch(children) => Some(children),
			Node::Leaf(_) => None,
		};
		map.into_iter().flat_map(|children| children.iter())
	}

	fn is_empty_branch(&self) -> bool {
		matches!(self, Node::Branch(children) if children.is_empty())
	}
}

/// Tree keyed by segment sequences.
#[derive(Debug, Clone)]
pub struct NestedKeyMap<K, V> {
	root: Node<K, V>,
}

impl<K, V> Default for NestedKeyMap<K, V>
where
	K: Hash + Eq + Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> NestedKeyMap<K, V>
where
	K: Hash + Eq + Clone,
{
	pub fn new() -> Self {
		Self { root: Node::branch() }
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty_branch()
	}

	/// Stores `value` at `keys`, returning the value it replaced.
	///
	/// An empty key sequence is ignored and returns `None`.
	pub fn set(&mut self, keys: &[K], value: V) -> Option<V> {
		insert_at(&mut self.root, keys, value)
	}

	/// Value at `keys`; `None` when any segment is unknown.
	pub fn get(&self, keys: &[K]) -> Option<&V> {
		self.prefix_get(keys)?.leaf()
	}

	pub fn get_mut(&mut self, keys: &[K]) -> Option<&mut V> {
		let mut node = &mut self.root;
		for segment in keys {
			node = match node {
				Node::Branch(children) => children.get_mut(segment)?,
				Node::Leaf(_) => return None,
			};
		}
		match node {
			Node::Leaf(value) => Some(value),
			Node::Branch(_) => None,
		}
	}

	/// Node rooted at a key prefix. The empty prefix is the root.
	pub fn prefix_get(&self, prefix: &[K]) -> Option<&Node<K, V>> {
		prefix.iter().try_fold(&self.root, |node, segment| node.child(segment))
	}

	/// Removes the value at `keys` and prunes branches it leaves empty.
	pub fn delete(&mut self, keys: &[K]) -> Option<V> {
		remove_at(&mut self.root, keys)
	}

	/// Greedy walk: at each position descend into the first substitute that
	/// is present. Fails as soon as a position has no present substitute.
	///
	/// `expand` gets the position and the segment and returns substitutes
	/// most-specific-first.
	pub fn detect_expansion<F>(&self, keys: &[K], mut expand: F) -> Option<&Node<K, V>>
	where
		F: FnMut(usize, &K) -> Vec<K>,
	{
		let mut node = &self.root;
		for (pos, segment) in keys.iter().enumerate() {
			node = expand(pos, segment)
				.iter()
				.find_map(|candidate| node.child(candidate))?;
		}
		Some(node)
	}

	/// Exhaustive walk: every present substitute at every position is
	/// followed, and every node reached after the last position is returned.
	pub fn select_expansions<F>(&self, keys: &[K], mut expand: F) -> Vec<&Node<K, V>>
	where
		F: FnMut(usize, &K) -> Vec<K>,
	{
		let substitutes: Vec<Vec<K>> = keys
			.iter()
			.enumerate()
			.map(|(pos, segment)| expand(pos, segment))
			.collect();
		let mut out = Vec::new();
		collect(&self.root, &substitutes, &mut out);
		out
	}
}

fn collect<'a, K, V>(node: &'a Node<K, V>, substitutes: &[Vec<K>], out: &mut Vec<&'a Node<K, V>>)
where
	K: Hash + Eq,
{
	let Some((first, rest)) = substitutes.split_first() else {
		out.push(node);
		return;
	};
	for candidate in first {
		if let Some(child) = node.child(candidate) {
			collect(child, rest, out);
		}
	}
}

fn insert_at<K, V>(node: &mut Node<K, V>, keys: &[K], value: V) -> Option<V>
where
	K: Hash + Eq + Clone,
{
	let (first, rest) = keys.split_first()?;
	if !matches!(node, Node::Branch(_)) {
		*node = Node::branch();
	}
	let Node::Branch(children) = node else {
		return None;
	};
	if rest.is_empty() {
		return match children.insert(first.clone(), Node::Leaf(value)) {
			Some(Node::Leaf(old)) => Some(old),
			_ => None,
		};
	}
	let child = children.entry(first.clone()).or_insert_with(Node::branch);
	insert_at(child, rest, value)
}

fn remove_at<K, V>(node: &mut Node<K, V>, keys: &[K]) -> Option<V>
where
	K: Hash + Eq,
{
	let (first, rest) = keys.split_first()?;
	let Node::Branch(children) = node else {
		return None;
	};
	if rest.is_empty() {
		if !matches!(children.get(first), Some(Node::Leaf(_))) {
			return None;
		}
		return match children.remove(first) {
			Some(Node::Leaf(value)) => Some(value),
			_ => None,
		};
	}
	let child = children.get_mut(first)?;
	let removed = remove_at(child, rest)?;
	if child.is_empty_branch() {
		children.remove(first);
	}
	Some(removed)
}
