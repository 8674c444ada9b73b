/// Builds an [`AqlQuery`](crate::AqlQuery) from a template with `{}` placeholders.
///
/// Each value is converted with [`AqlValue::from`](crate::AqlValue), so it
/// can be anything that converts into one: JSON values, numbers, strings,
/// `Option`s, collection references, literals and other queries.
///
/// ```rust
/// use arango_aql::aql;
///
/// let query = aql!("FOR x IN 1..{} FILTER x > {} RETURN x", 10, 5);
/// assert_eq!(query.query(), "FOR x IN 1..@value0 FILTER x > @value1 RETURN x");
/// ```
///
/// Write `{{` and `}}` for literal braces next to a placeholder.
#[macro_export]
macro_rules! aql {
    ($template:expr $(,)?) => {
        $crate::AqlQuery::from_format($template, ::std::vec::Vec::new())
    };
    ($template:expr, $($value:expr),+ $(,)?) => {
        $crate::AqlQuery::from_format(
            $template,
            ::std::vec![$($crate::AqlValue::from($value)),+],
        )
    };
}
