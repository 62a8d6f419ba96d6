//!
//! Traits needed to build projections and mutations.
//!

pub use crate::database::{Database, Executor};
pub use crate::filter::{Filter, Range};
pub use crate::predicate::Operand;
pub use crate::project::{Field, Mapper, Selection};
pub use crate::quantify::{AsOption, AsSelf, AsVec, Quantify};
pub use crate::schema::{Instance, Relation};
