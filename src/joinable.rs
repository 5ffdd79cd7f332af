//! Joinable Capability
//!
//! Anything that can take part in a join: a plain [`Relation`] or a
//! [`ConnectedRelation`](crate::connected::ConnectedRelation). Entry points
//! normalize both to `&Relation` here, so the join layer never inspects which
//! one it was handed.

use crate::engine::Relation;

pub trait Joinable {
    /// The relation every join operates on.
    fn relation(&self) -> &Relation;

    fn columns(&self) -> &[String] {
        self.relation().columns()
    }

    /// Joins are only defined between relations of the same connection.
    fn is_joinable_with(&self, other: &dyn Joinable) -> bool {
        self.relation()
            .connection()
            .same_as(other.relation().connection())
    }
}

impl Joinable for Relation {
    fn relation(&self) -> &Relation {
        self
    }
}
