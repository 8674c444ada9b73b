use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::literal::AqlLiteral;
use crate::reference::{AsNamedReference, NamedReference};

/// Bind variables of a query, keyed by bind parameter name.
///
/// Collection bind parameters keep their `@` prefix in the key
/// (`"@value0"`), exactly as the server expects them.
pub type BindVars = BTreeMap<String, BindValue>;

/// Value bound to a bind parameter.
///
/// Values are kept as they were interpolated and only turned into JSON when
/// the query is serialized for the server.
#[derive(Clone, Debug)]
pub enum BindValue {
    /// An owned JSON value.
    Value(Value),
    /// A shared JSON value, bound by identity.
    Shared(Arc<Value>),
    /// Name of a collection or view.
    Name(Arc<str>),
    /// Names of several collections or views.
    Names(Vec<Arc<str>>),
}

impl BindValue {
    /// Returns the JSON form of the bound value.
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::Value(value) => value.clone(),
            BindValue::Shared(value) => Value::clone(value),
            BindValue::Name(name) => Value::String(name.to_string()),
            BindValue::Names(names) => names
                .iter()
                .map(|name| Value::String(name.to_string()))
                .collect(),
        }
    }
}

impl Serialize for BindValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BindValue::Value(value) => value.serialize(serializer),
            BindValue::Shared(value) => value.as_ref().serialize(serializer),
            BindValue::Name(name) => serializer.serialize_str(name),
            BindValue::Names(names) => serializer.collect_seq(names.iter().map(|name| &**name)),
        }
    }
}

impl PartialEq for BindValue {
    fn eq(&self, other: &Self) -> bool {
        self.to_json() == other.to_json()
    }
}

impl PartialEq<Value> for BindValue {
    fn eq(&self, other: &Value) -> bool {
        self.to_json() == *other
    }
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        BindValue::Value(value)
    }
}

/// A value interpolated into an AQL template.
///
/// Most of the time it is created implicitly by [`aql!`](crate::aql) through
/// one of the `From` implementations.
#[derive(Clone, Debug, Default)]
pub enum AqlValue {
    /// Contributes nothing to the query. Produced from `None`.
    #[default]
    Undefined,
    /// A nested query, flattened into the enclosing one.
    Query(AqlQuery),
    /// Raw AQL text.
    Literal(AqlLiteral),
    /// A collection or view, bound as a collection bind parameter.
    Reference(NamedReference),
    /// Several collections or views, bound as one collection bind parameter.
    References(Arc<[NamedReference]>),
    /// An owned value. Never shares a bind variable with other values.
    Value(Value),
    /// A shared value. Interpolating the same `Arc` twice reuses its bind variable.
    Shared(Arc<Value>),
}

impl AqlValue {
    /// Interpolates a collection or view handle as a collection bind parameter.
    pub fn reference(handle: &impl AsNamedReference) -> Self {
        AqlValue::Reference(handle.named_reference().clone())
    }

    /// Interpolates several handles as one collection bind parameter.
    pub fn references<'a, H, I>(handles: I) -> Self
    where
        H: AsNamedReference + 'a,
        I: IntoIterator<Item = &'a H>,
    {
        AqlValue::References(
            handles
                .into_iter()
                .map(|handle| handle.named_reference().clone())
                .collect(),
        )
    }

    /// Interpolates any serializable value, such as a user-defined struct.
    ///
    /// The value is converted to JSON once. Clones of the returned value
    /// share one bind variable when interpolated into the same query.
    ///
    /// ```rust
    /// use arango_aql::{aql, AqlValue};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Range { min: u32, max: u32 }
    ///
    /// let range = AqlValue::serialized(&Range { min: 1, max: 5 })?;
    /// let query = aql!("FOR x IN {}.min..{}.max RETURN x", range.clone(), range);
    /// assert_eq!(query.query(), "FOR x IN @value0.min..@value0.max RETURN x");
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(AqlValue::Shared(Arc::new(serde_json::to_value(value)?)))
    }
}

impl From<AqlQuery> for AqlValue {
    fn from(query: AqlQuery) -> Self {
        AqlValue::Query(query)
    }
}

impl From<&AqlQuery> for AqlValue {
    fn from(query: &AqlQuery) -> Self {
        AqlValue::Query(query.clone())
    }
}

impl From<AqlLiteral> for AqlValue {
    fn from(literal: AqlLiteral) -> Self {
        AqlValue::Literal(literal)
    }
}

impl From<&AqlLiteral> for AqlValue {
    fn from(literal: &AqlLiteral) -> Self {
        AqlValue::Literal(literal.clone())
    }
}

impl From<NamedReference> for AqlValue {
    fn from(reference: NamedReference) -> Self {
        AqlValue::Reference(reference)
    }
}

impl From<&NamedReference> for AqlValue {
    fn from(reference: &NamedReference) -> Self {
        AqlValue::Reference(reference.clone())
    }
}

impl From<Vec<NamedReference>> for AqlValue {
    fn from(references: Vec<NamedReference>) -> Self {
        AqlValue::References(references.into())
    }
}

impl From<Arc<[NamedReference]>> for AqlValue {
    fn from(references: Arc<[NamedReference]>) -> Self {
        AqlValue::References(references)
    }
}

impl From<&Arc<[NamedReference]>> for AqlValue {
    fn from(references: &Arc<[NamedReference]>) -> Self {
        AqlValue::References(Arc::clone(references))
    }
}

impl From<Value> for AqlValue {
    fn from(value: Value) -> Self {
        AqlValue::Value(value)
    }
}

impl From<&Value> for AqlValue {
    fn from(value: &Value) -> Self {
        AqlValue::Value(value.clone())
    }
}

impl From<Arc<Value>> for AqlValue {
    fn from(value: Arc<Value>) -> Self {
        AqlValue::Shared(value)
    }
}

impl From<&Arc<Value>> for AqlValue {
    fn from(value: &Arc<Value>) -> Self {
        AqlValue::Shared(Arc::clone(value))
    }
}

impl From<&str> for AqlValue {
    fn from(value: &str) -> Self {
        AqlValue::Value(Value::String(value.to_owned()))
    }
}

impl From<String> for AqlValue {
    fn from(value: String) -> Self {
        AqlValue::Value(Value::String(value))
    }
}

impl From<&String> for AqlValue {
    fn from(value: &String) -> Self {
        AqlValue::Value(Value::String(value.clone()))
    }
}

impl<T: Into<AqlValue>> From<Option<T>> for AqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AqlValue::Undefined, Into::into)
    }
}

macro_rules! impl_from_json_convertible {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AqlValue {
                fn from(value: $ty) -> Self {
                    AqlValue::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_json_convertible!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Segments and values a query was built from.
#[derive(Debug)]
struct TemplateSource {
    strings: Vec<String>,
    values: Vec<AqlValue>,
}

/// An AQL query together with its bind variables.
///
/// Built with [`aql!`](crate::aql), [`AqlQuery::template`], [`join`], or
/// from a plain query string. Immutable once constructed.
#[derive(Clone, Debug, Default)]
pub struct AqlQuery {
    query: String,
    bind_vars: BindVars,
    source: Option<Arc<TemplateSource>>,
}

impl AqlQuery {
    /// Builds a query from literal segments and the values between them,
    /// the way a tagged template literal would.
    ///
    /// `strings` is expected to hold exactly one more element than `values`.
    /// Missing values are treated as [`AqlValue::Undefined`], surplus values
    /// are ignored.
    pub fn template<I, S>(strings: I, values: Vec<AqlValue>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = TemplateSource {
            strings: strings.into_iter().map(Into::into).collect(),
            values,
        };
        let mut context = BindContext::default();
        context.flatten(&source.strings, &source.values);

        AqlQuery {
            query: context.query,
            bind_vars: context.bind_vars,
            source: Some(Arc::new(source)),
        }
    }

    /// Builds a query from a format string with `{}` placeholders.
    ///
    /// This is what [`aql!`](crate::aql) expands to. Braces follow `format!`
    /// escaping: `{{` and `}}` produce a single brace, any other brace is
    /// kept as it is.
    pub fn from_format(template: &str, values: Vec<AqlValue>) -> Self {
        let strings = split_placeholders(template);
        debug_assert_eq!(
            strings.len(),
            values.len() + 1,
            "AQL template {template:?} has {} placeholders but {} values were given",
            strings.len() - 1,
            values.len(),
        );
        Self::template(strings, values)
    }

    /// Wraps a ready query string and its bind variables.
    ///
    /// Nesting such a query splices its text and merges its bind variables
    /// unchanged, so its names must not clash with generated `valueN` names.
    pub fn with_bind_vars(query: impl Into<String>, bind_vars: BindVars) -> Self {
        AqlQuery {
            query: query.into(),
            bind_vars,
            source: None,
        }
    }

    /// The query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The bind variables referenced by the query text.
    pub fn bind_vars(&self) -> &BindVars {
        &self.bind_vars
    }

    /// Returns `true` if the query text is empty.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Splits the query into its text and bind variables.
    pub fn into_parts(self) -> (String, BindVars) {
        (self.query, self.bind_vars)
    }
}

impl PartialEq for AqlQuery {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.bind_vars == other.bind_vars
    }
}

impl From<&str> for AqlQuery {
    fn from(query: &str) -> Self {
        AqlQuery::template([query], Vec::new())
    }
}

impl From<String> for AqlQuery {
    fn from(query: String) -> Self {
        AqlQuery::template([query], Vec::new())
    }
}

impl Serialize for AqlQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AqlQuery", 2)?;
        state.serialize_field("query", &self.query)?;
        state.serialize_field("bindVars", &self.bind_vars)?;
        state.end()
    }
}

/// Joins values into one query, separated by a single space.
///
/// See [`join_with`].
pub fn join<I>(values: I) -> AqlQuery
where
    I: IntoIterator,
    I::Item: Into<AqlValue>,
{
    join_with(values, " ")
}

/// Joins values into one query, separated by `separator`.
///
/// Every value is treated as if it was interpolated into a template, so
/// nested queries are flattened and everything else is bound. The separator
/// is inserted as literal text.
pub fn join_with<I>(values: I, separator: &str) -> AqlQuery
where
    I: IntoIterator,
    I::Item: Into<AqlValue>,
{
    let values: Vec<AqlValue> = values.into_iter().map(Into::into).collect();
    if values.is_empty() {
        return AqlQuery::default();
    }

    let mut strings = Vec::with_capacity(values.len() + 1);
    strings.push(String::new());
    strings.extend(std::iter::repeat(separator.to_owned()).take(values.len() - 1));
    strings.push(String::new());

    AqlQuery::template(strings, values)
}

fn split_placeholders(template: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) => {
                chars.next();
                current.push('{');
            }
            ('}', Some('}')) => {
                chars.next();
                current.push('}');
            }
            ('{', Some('}')) => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// State of one top-level template evaluation, threaded through the
/// flattening of all nested queries.
#[derive(Default)]
struct BindContext {
    query: String,
    bind_vars: BindVars,
    // Keyed by the address of the interpolated allocation.
    names_by_identity: HashMap<usize, String>,
    counter: usize,
}

impl BindContext {
    fn flatten(&mut self, strings: &[String], values: &[AqlValue]) {
        let Some((first, rest)) = strings.split_first() else {
            return;
        };
        self.query.push_str(first);

        let mut values = values.iter();
        for segment in rest {
            if let Some(value) = values.next() {
                self.interpolate(value);
            }
            self.query.push_str(segment);
        }
    }

    fn interpolate(&mut self, value: &AqlValue) {
        match value {
            AqlValue::Undefined => {}
            AqlValue::Query(nested) => match &nested.source {
                Some(source) => self.flatten(&source.strings, &source.values),
                None => {
                    self.query.push_str(&nested.query);
                    self.bind_vars.extend(
                        nested
                            .bind_vars
                            .iter()
                            .map(|(name, value)| (name.clone(), value.clone())),
                    );
                }
            },
            AqlValue::Literal(literal) => self.query.push_str(literal.as_str()),
            AqlValue::Reference(reference) => {
                self.bind(Some(reference.identity()), true, || {
                    BindValue::Name(reference.shared_name())
                });
            }
            AqlValue::References(references) => {
                let identity = Arc::as_ptr(references) as *const u8 as usize;
                self.bind(Some(identity), true, || {
                    BindValue::Names(references.iter().map(NamedReference::shared_name).collect())
                });
            }
            AqlValue::Shared(shared) => {
                let identity = Arc::as_ptr(shared) as usize;
                self.bind(Some(identity), false, || BindValue::Shared(Arc::clone(shared)));
            }
            AqlValue::Value(owned) => {
                self.bind(None, false, || BindValue::Value(owned.clone()));
            }
        }
    }

    fn bind(
        &mut self,
        identity: Option<usize>,
        is_reference: bool,
        value: impl FnOnce() -> BindValue,
    ) {
        if let Some(name) = identity.and_then(|id| self.names_by_identity.get(&id).cloned()) {
            self.query.push('@');
            self.query.push_str(&name);
            return;
        }

        let mut name = format!("value{}", self.counter);
        self.counter += 1;
        if is_reference {
            name.insert(0, '@');
        }

        self.query.push('@');
        self.query.push_str(&name);
        self.bind_vars.insert(name.clone(), value());
        if let Some(id) = identity {
            self.names_by_identity.insert(id, name);
        }
    }
}
