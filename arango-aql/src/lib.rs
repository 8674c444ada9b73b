//! AQL query templates for the ArangoDB driver.
//!
//! Queries are composed from literal text and interpolated values. Every
//! interpolated value becomes a bind variable, so user input never ends up
//! inside the query text:
//!
//! ```rust
//! use arango_aql::{aql, literal, NamedReference};
//!
//! let users = NamedReference::collection("users");
//! let role = "admin";
//! let filter = aql!("FILTER u.role == {}", role);
//! let query = aql!("FOR u IN {} {} {} RETURN u", &users, filter, literal("LIMIT 10"));
//!
//! assert_eq!(
//!     query.query(),
//!     "FOR u IN @@value0 FILTER u.role == @value1 LIMIT 10 RETURN u"
//! );
//! assert_eq!(query.bind_vars()["@value0"], serde_json::json!("users"));
//! assert_eq!(query.bind_vars()["value1"], serde_json::json!("admin"));
//! ```
//!
//! Nested queries are flattened into the enclosing one with a single shared
//! counter, and reference-typed values (collection handles, `Arc`-wrapped JSON)
//! interpolated more than once share one bind variable.

mod literal;
mod macros;
mod query;
mod reference;

pub use literal::{literal, AqlLiteral, ToAql};
pub use query::{join, join_with, AqlQuery, AqlValue, BindValue, BindVars};
pub use reference::{AsNamedReference, NamedReference, ReferenceKind};
