// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Neighbor-indexed values.
//!
//! A [`Field`] answers "what did each aligned neighbor compute at this
//! point". It remembers the local node id and the set of ids that were aligned
//! where it was created; every reduction only looks at those ids.
//!
//! Reductions visit values in ascending [`NodeId`] order. Operators handed to
//! [`Field::fold`] and [`Field::hood`] are expected to be associative and
//! commutative; when they are not, this order is the one that applies.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Sub};

use crate::ident::NodeId;

/// Immutable mapping from node id to value, plus its alignment domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    self_id: NodeId,
    aligned: BTreeSet<NodeId>,
    values: BTreeMap<NodeId, T>,
}

impl<T> Field<T> {
    /// Builds a field for node `self_id` whose alignment domain is `aligned`.
    pub fn new(self_id: NodeId, aligned: BTreeSet<NodeId>, values: BTreeMap<NodeId, T>) -> Self {
        Self {
            self_id,
            aligned,
            values,
        }
    }

    /// Builds a field holding only the local value.
    pub fn local_only(self_id: NodeId, value: T) -> Self {
        Self::new(
            self_id,
            BTreeSet::from([self_id]),
            BTreeMap::from([(self_id, value)]),
        )
    }

    /// Id of the node that owns this field.
    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    /// Value at the local node.
    pub fn local(&self) -> Option<&T> {
        self.values.get(&self.self_id)
    }

    /// Value for `id`, absent when `id` is not aligned or has no value.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        if self.aligned.contains(&id) {
            self.values.get(&id)
        } else {
            None
        }
    }

    /// Returns `true` if `id` is aligned and has a value.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Aligned `(id, value)` pairs in ascending id order, self included.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.values
            .iter()
            .filter(|(id, _)| self.aligned.contains(*id))
            .map(|(id, v)| (*id, v))
    }

    /// Aligned ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Number of aligned values.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if no aligned value exists.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Aligned values by id, optionally without the local node.
    pub fn aligned_view(&self, include_self: bool) -> BTreeMap<NodeId, &T> {
        self.iter()
            .filter(|(id, _)| include_self || *id != self.self_id)
            .collect()
    }

    /// Folds the aligned values starting from `seed`; returns `seed` when
    /// nothing is aligned.
    pub fn fold<A, F>(&self, seed: A, mut op: F) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        self.iter().fold(seed, |acc, (_, v)| op(acc, v))
    }

    /// Reduces the aligned values seeded from the lowest-id one; returns
    /// `default` only when nothing is aligned.
    pub fn hood<F>(&self, default: T, mut op: F) -> T
    where
        T: Clone,
        F: FnMut(T, &T) -> T,
    {
        let mut values = self.iter().map(|(_, v)| v);
        match values.next() {
            Some(first) => values.fold(first.clone(), |acc, v| op(acc, v)),
            None => default,
        }
    }

    /// Aligned entry whose value is smallest under `cmp`; ties go to the
    /// lowest id.
    pub fn min_by<F>(&self, mut cmp: F) -> Option<(NodeId, &T)>
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.iter().min_by(|a, b| cmp(a.1, b.1))
    }

    /// Aligned entry whose value is largest under `cmp`; ties go to the
    /// highest id.
    pub fn max_by<F>(&self, mut cmp: F) -> Option<(NodeId, &T)>
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.iter().max_by(|a, b| cmp(a.1, b.1))
    }

    /// Copy of the field without the local node.
    #[must_use]
    pub fn without_self(&self) -> Self
    where
        T: Clone,
    {
        let mut out = self.clone();
        out.values.remove(&self.self_id);
        out.aligned.remove(&self.self_id);
        out
    }

    /// Applies `f` to every value.
    pub fn map<R, F>(&self, mut f: F) -> Field<R>
    where
        F: FnMut(&T) -> R,
    {
        Field {
            self_id: self.self_id,
            aligned: self.aligned.clone(),
            values: self.values.iter().map(|(id, v)| (*id, f(v))).collect(),
        }
    }

    /// Combines two fields elementwise over the ids present in both.
    pub fn zip_with<U, R, F>(&self, other: &Field<U>, mut op: F) -> Field<R>
    where
        F: FnMut(&T, &U) -> R,
    {
        let values = self
            .values
            .iter()
            .filter_map(|(id, a)| other.values.get(id).map(|b| (*id, op(a, b))))
            .collect();
        Field {
            self_id: self.self_id,
            aligned: self.aligned.intersection(&other.aligned).copied().collect(),
            values,
        }
    }

    /// Combines every value with one scalar.
    pub fn with_scalar<S, R, F>(&self, scalar: &S, mut op: F) -> Field<R>
    where
        F: FnMut(&T, &S) -> R,
    {
        self.map(|v| op(v, scalar))
    }

    /// Elementwise `self < other` over the ids present in both.
    pub fn lt(&self, other: &Self) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| a < b)
    }

    /// Elementwise `self <= other` over the ids present in both.
    pub fn le(&self, other: &Self) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| a <= b)
    }

    /// Elementwise `self > other` over the ids present in both.
    pub fn gt(&self, other: &Self) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| a > b)
    }

    /// Elementwise `self >= other` over the ids present in both.
    pub fn ge(&self, other: &Self) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| a >= b)
    }

    /// `value < bound` for every id.
    pub fn lt_scalar(&self, bound: &T) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.map(|v| v < bound)
    }

    /// `value <= bound` for every id.
    pub fn le_scalar(&self, bound: &T) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.map(|v| v <= bound)
    }

    /// `value > bound` for every id.
    pub fn gt_scalar(&self, bound: &T) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.map(|v| v > bound)
    }

    /// `value >= bound` for every id.
    pub fn ge_scalar(&self, bound: &T) -> Field<bool>
    where
        T: PartialOrd,
    {
        self.map(|v| v >= bound)
    }

    /// Values whose id maps to `true` in `mask`, in ascending id order.
    pub fn select(&self, mask: &Field<bool>) -> Vec<&T> {
        self.iter()
            .filter(|(id, _)| mask.get(*id).copied().unwrap_or(false))
            .map(|(_, v)| v)
            .collect()
    }

    /// Consumes the field, returning the aligned values.
    pub fn into_aligned(self) -> BTreeMap<NodeId, T> {
        let aligned = self.aligned;
        self.values
            .into_iter()
            .filter(|(id, _)| aligned.contains(id))
            .collect()
    }
}

macro_rules! elementwise_op {
    ($trait:ident, $method:ident) => {
        impl<T> $trait for &Field<T>
        where
            T: Clone + $trait<Output = T>,
        {
            type Output = Field<T>;

            fn $method(self, rhs: Self) -> Field<T> {
                self.zip_with(rhs, |a, b| a.clone().$method(b.clone()))
            }
        }

        impl<T> $trait for Field<T>
        where
            T: Clone + $trait<Output = T>,
        {
            type Output = Field<T>;

            fn $method(self, rhs: Self) -> Field<T> {
                (&self).$method(&rhs)
            }
        }
    };
}

elementwise_op!(Add, add);
elementwise_op!(Sub, sub);
elementwise_op!(Mul, mul);
elementwise_op!(Div, div);
elementwise_op!(Rem, rem);
elementwise_op!(BitAnd, bitand);
elementwise_op!(BitOr, bitor);
elementwise_op!(BitXor, bitxor);

macro_rules! unary_op {
    ($trait:ident, $method:ident) => {
        impl<T> $trait for &Field<T>
        where
            T: Clone + $trait<Output = T>,
        {
            type Output = Field<T>;

            fn $method(self) -> Field<T> {
                self.map(|v| v.clone().$method())
            }
        }

        impl<T> $trait for Field<T>
        where
            T: Clone + $trait<Output = T>,
        {
            type Output = Field<T>;

            fn $method(self) -> Field<T> {
                (&self).$method()
            }
        }
    };
}

unary_op!(Neg, neg);
unary_op!(Not, not);

// `field <op> scalar` applies to every id. Spelled out per scalar type: a
// blanket `Op<T> for Field<T>` would overlap with `Op<Field<T>>`.
macro_rules! scalar_ops {
    ($($scalar:ty),* $(,)?) => {
        $(
            scalar_ops!(@one $scalar, Add, add);
            scalar_ops!(@one $scalar, Sub, sub);
            scalar_ops!(@one $scalar, Mul, mul);
            scalar_ops!(@one $scalar, Div, div);
            scalar_ops!(@one $scalar, Rem, rem);
        )*
    };
    (@one $scalar:ty, $trait:ident, $method:ident) => {
        impl $trait<$scalar> for &Field<$scalar> {
            type Output = Field<$scalar>;

            fn $method(self, rhs: $scalar) -> Field<$scalar> {
                self.map(|v| v.$method(rhs))
            }
        }

        impl $trait<$scalar> for Field<$scalar> {
            type Output = Field<$scalar>;

            fn $method(self, rhs: $scalar) -> Field<$scalar> {
                (&self).$method(rhs)
            }
        }
    };
}

scalar_ops!(f32, f64, i32, i64, u32, u64, usize);
