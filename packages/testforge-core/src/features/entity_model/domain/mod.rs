//! Entity records

mod aggregate;
mod function;
mod issue;
mod preprocessor;
mod variable;

pub use aggregate::{
    AggregateDefinition, AggregateKind, AggregateLayout, EnumDefinition, Enumerator, Member,
    TypedefDefinition,
};
pub use function::{Function, FunctionFlags, Parameter};
pub use issue::{Issue, IssueKind, Severity};
pub use preprocessor::{ConditionalDirective, DirectiveKind, IncludeDirective, MacroDefinition};
pub use variable::{Variable, VariableScope};
