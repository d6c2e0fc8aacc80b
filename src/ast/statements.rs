/// Statement shape of one source line.
///
/// Produced by [`classify`](crate::evaluator::classify); the payloads are
/// still source text, parsed only once the shape is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Value assignment
    ///
    /// # Example
    /// ```text
    /// x: 5
    /// t: select from trade where price > 200
    /// ```
    Assignment { name: String, expression: String },

    /// Function definition whose target carries a parameter marker
    ///
    /// # Example
    /// ```text
    /// f{x}: x*x
    /// ```
    FunctionDefinition { name: String, source: String },

    /// Bracketed call of a named function
    ///
    /// # Example
    /// ```text
    /// calculateVWAP[trade]
    /// ```
    Call { function: String, source: String },

    /// `select` query
    Query(String),

    /// Anything else
    Expression(String),
}

impl Statement {
    /// Assignments and definitions report a binding instead of echoing the
    /// statement back.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            Statement::Assignment { .. } | Statement::FunctionDefinition { .. }
        )
    }
}
