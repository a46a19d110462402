//! CODIE AST — the typed node set spec.md §4.5 assigns to each keyword.

#[derive(Debug, Clone, PartialEq)]
pub enum CodieNode {
    /// `pug` — named entry point, executes children in order.
    Entry { name: String, children: Vec<CodieNode> },
    /// `bark` — bind a context variable from a source reference.
    Fetch { target: Option<String>, source: String },
    /// `elf` — bind a context variable from a literal or another ref.
    Bind { target: String, value: String },
    /// `pin` — set an immutable constant.
    Const { name: String, value: String },
    /// `cali` — invoke a named function from the safe-call whitelist.
    Call { name: String, args: Vec<String> },
    /// `spin` — iterate `var IN collection`.
    Loop { var: String, collection: String, body: Vec<CodieNode> },
    /// `turk` — conditional transform.
    Transform { condition: String, body: Vec<CodieNode> },
    /// `fence` — guard block; constraint violations are recorded, not raised.
    Guard { label: String, children: Vec<CodieNode> },
    /// `bone` — a constraint, optionally negated (`NOT:` prefix).
    Rule { negate: bool, condition: String, action: String },
    /// `blob` — define a record type and a zero-valued instance.
    Struct { name: String, fields: Vec<String> },
    /// `biz` — produce a value, interpolating `{var}` references.
    Return { template: String },
    /// `anchor` — append a labelled checkpoint snapshot.
    Checkpoint { label: String },
    Comment,
}
