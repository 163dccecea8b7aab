//! Query input model: the operator chain, its expressions, and the bindings
//! lambda parameters resolve to during translation.

pub mod logical_expr;
pub mod logical_plan;
pub mod typed_variable;
